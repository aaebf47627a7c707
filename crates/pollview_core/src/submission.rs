use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AnswerId, Demographic, PollDefinition, QuestionId};

const MAX_AGE: u32 = 150;

/// Respondent details as typed by the user. Blank strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Demographics {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
}

impl Demographics {
    fn get(&self, field: Demographic) -> Option<&str> {
        let value = match field {
            Demographic::Name => self.name.as_deref(),
            Demographic::Gender => self.gender.as_deref(),
            Demographic::Age => self.age.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please answer all questions")]
    UnansweredQuestions { missing: Vec<QuestionId> },
    #[error("question {0} is not part of this poll")]
    UnknownQuestion(QuestionId),
    #[error("answer {answer} does not belong to question {question}")]
    UnknownAnswer {
        question: QuestionId,
        answer: AnswerId,
    },
    #[error("Please provide your {}", join_fields(.fields))]
    MissingDemographics { fields: Vec<Demographic> },
    #[error("'{0}' is not a valid age")]
    InvalidAge(String),
}

/// Body of `POST /responses/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub poll_code: String,
    pub respondent_name: Option<String>,
    pub respondent_gender: Option<String>,
    pub respondent_age: Option<u32>,
    pub answers: Vec<ResponseAnswer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAnswer {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
}

/// Answers collected from a participant before submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseDraft {
    selections: BTreeMap<QuestionId, AnswerId>,
    pub demographics: Demographics,
}

impl ResponseDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `answer` for `question`, replacing any earlier choice.
    pub fn select(&mut self, question: QuestionId, answer: AnswerId) {
        self.selections.insert(question, answer);
    }

    pub fn selection(&self, question: QuestionId) -> Option<AnswerId> {
        self.selections.get(&question).copied()
    }

    /// Checks the draft against `poll` and builds the request. Nothing is sent
    /// when this fails.
    pub fn validate(&self, poll: &PollDefinition) -> Result<SubmitResponseRequest, ValidationError> {
        for (&question_id, &answer_id) in &self.selections {
            let question = poll
                .question(question_id)
                .ok_or(ValidationError::UnknownQuestion(question_id))?;
            if !question.has_answer(answer_id) {
                return Err(ValidationError::UnknownAnswer {
                    question: question_id,
                    answer: answer_id,
                });
            }
        }

        let ordered = poll.ordered_questions();
        let missing: Vec<QuestionId> = ordered
            .iter()
            .map(|q| q.id)
            .filter(|id| !self.selections.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::UnansweredQuestions { missing });
        }

        let absent: Vec<Demographic> = poll
            .demographics()
            .into_iter()
            .filter(|field| self.demographics.get(*field).is_none())
            .collect();
        if !absent.is_empty() {
            return Err(ValidationError::MissingDemographics { fields: absent });
        }

        let respondent_age = self
            .demographics
            .get(Demographic::Age)
            .map(parse_age)
            .transpose()?;

        Ok(SubmitResponseRequest {
            poll_code: poll.poll_code.clone(),
            respondent_name: self.demographics.get(Demographic::Name).map(str::to_string),
            respondent_gender: self
                .demographics
                .get(Demographic::Gender)
                .map(str::to_string),
            respondent_age,
            answers: ordered
                .iter()
                .filter_map(|q| {
                    self.selection(q.id).map(|answer_id| ResponseAnswer {
                        question_id: q.id,
                        answer_id,
                    })
                })
                .collect(),
        })
    }
}

fn join_fields(fields: &[Demographic]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_age(raw: &str) -> Result<u32, ValidationError> {
    match raw.parse::<u32>() {
        Ok(age) if (1..=MAX_AGE).contains(&age) => Ok(age),
        _ => Err(ValidationError::InvalidAge(raw.to_string())),
    }
}
