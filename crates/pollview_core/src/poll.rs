use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::serde_util::null_as_default;
use crate::{AnswerId, PollId, QuestionId};

/// Chart type the authoring form preselects (bar chart).
pub const DEFAULT_CHART_TYPE_ID: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollStatus {
    Active,
    Stopped,
    Completed,
}

impl PollStatus {
    pub fn id(self) -> u64 {
        match self {
            PollStatus::Active => 1,
            PollStatus::Stopped => 2,
            PollStatus::Completed => 3,
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            1 => Some(PollStatus::Active),
            2 => Some(PollStatus::Stopped),
            3 => Some(PollStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollStatus::Active => write!(f, "ACTIVE"),
            PollStatus::Stopped => write!(f, "STOPPED"),
            PollStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown poll status '{0}' (expected active, stopped or completed)")]
pub struct UnknownPollStatus(pub String);

impl FromStr for PollStatus {
    type Err = UnknownPollStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "1" => Ok(PollStatus::Active),
            "stopped" | "2" => Ok(PollStatus::Stopped),
            "completed" | "3" => Ok(PollStatus::Completed),
            _ => Err(UnknownPollStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Demographic {
    Name,
    Gender,
    Age,
}

impl Demographic {
    pub fn as_str(self) -> &'static str {
        match self {
            Demographic::Name => "name",
            Demographic::Gender => "gender",
            Demographic::Age => "age",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Demographic::Name),
            "gender" => Some(Demographic::Gender),
            "age" => Some(Demographic::Age),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollStatusInfo {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

impl PollStatusInfo {
    pub fn status(&self) -> Option<PollStatus> {
        PollStatus::from_id(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartTypeInfo {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A poll as returned by `GET /polls/code/{pollCode}` and the admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDefinition {
    pub id: PollId,
    pub title: String,
    pub poll_code: String,
    #[serde(default)]
    pub share_link: Option<String>,
    #[serde(default)]
    pub poll_status: Option<PollStatusInfo>,
    #[serde(default)]
    pub chart_type: Option<ChartTypeInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allow_view_results: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required_demographics: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<QuestionDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_responses: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDefinition {
    pub id: QuestionId,
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question_order: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<AnswerDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDefinition {
    pub id: AnswerId,
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer_order: u32,
}

impl PollDefinition {
    pub fn status(&self) -> Option<PollStatus> {
        self.poll_status.as_ref().and_then(PollStatusInfo::status)
    }

    /// Questions in display order.
    pub fn ordered_questions(&self) -> Vec<&QuestionDefinition> {
        let mut questions: Vec<_> = self.questions.iter().collect();
        questions.sort_by_key(|q| q.question_order);
        questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Known demographic fields the poll requires; unknown names are skipped.
    pub fn demographics(&self) -> Vec<Demographic> {
        let mut fields: Vec<_> = self
            .required_demographics
            .iter()
            .filter_map(|raw| Demographic::parse(raw))
            .collect();
        fields.sort();
        fields.dedup();
        fields
    }
}

impl QuestionDefinition {
    /// Answers in display order.
    pub fn ordered_answers(&self) -> Vec<&AnswerDefinition> {
        let mut answers: Vec<_> = self.answers.iter().collect();
        answers.sort_by_key(|a| a.answer_order);
        answers
    }

    pub fn has_answer(&self, id: AnswerId) -> bool {
        self.answers.iter().any(|a| a.id == id)
    }
}

/// Dashboard summary for one admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_polls: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_questions: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_polls: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_polls: Vec<PollDefinition>,
}

/// A poll being authored, typically read from a RON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDraft {
    pub title: String,
    #[serde(default)]
    pub allow_view_results: bool,
    #[serde(default)]
    pub required_demographics: Vec<Demographic>,
    #[serde(default)]
    pub chart_type_id: Option<u64>,
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub answers: Vec<String>,
}

/// All problems found in a [`PollDraft`], in form order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .problems.join("; "))]
pub struct AuthoringError {
    pub problems: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub title: String,
    pub poll_status_id: u64,
    pub chart_type_id: u64,
    pub allow_view_results: bool,
    pub required_demographics: Vec<String>,
    pub questions: Vec<QuestionRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub text: String,
    pub question_order: u32,
    pub answers: Vec<String>,
}

impl PollDraft {
    pub fn validate(&self) -> Result<(), AuthoringError> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push("Poll title is required".to_string());
        }
        if self.questions.is_empty() {
            problems.push("At least one question is required".to_string());
        }
        for (index, question) in self.questions.iter().enumerate() {
            let number = index + 1;
            if question.text.trim().is_empty() {
                problems.push(format!("Question {number} text is required"));
            }
            if question.answers.len() < 2 {
                problems.push(format!("Question {number} must have at least 2 answers"));
            }
            for (answer_index, answer) in question.answers.iter().enumerate() {
                if answer.trim().is_empty() {
                    problems.push(format!(
                        "Question {number}, Answer {} is required",
                        answer_index + 1
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AuthoringError { problems })
        }
    }

    /// Validates and builds the wire request. New polls start active.
    pub fn into_request(self) -> Result<CreatePollRequest, AuthoringError> {
        self.validate()?;
        let mut demographics = self.required_demographics;
        demographics.sort();
        demographics.dedup();

        Ok(CreatePollRequest {
            title: self.title.trim().to_string(),
            poll_status_id: PollStatus::Active.id(),
            chart_type_id: self.chart_type_id.unwrap_or(DEFAULT_CHART_TYPE_ID),
            allow_view_results: self.allow_view_results,
            required_demographics: demographics
                .into_iter()
                .map(|d| d.as_str().to_string())
                .collect(),
            questions: self
                .questions
                .into_iter()
                .zip(1u32..)
                .map(|(question, order)| QuestionRequest {
                    text: question.text.trim().to_string(),
                    question_order: order,
                    answers: question
                        .answers
                        .iter()
                        .map(|a| a.trim().to_string())
                        .collect(),
                })
                .collect(),
        })
    }
}
