use serde::{Deserialize, Serialize};

use crate::serde_util::null_as_default;

pub type PollId = u64;
pub type QuestionId = u64;
pub type AnswerId = u64;

/// Aggregated results of one poll at one point in time.
///
/// Snapshots are only ever replaced wholesale; nothing in the workspace
/// patches one field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResultSnapshot {
    pub poll_id: PollId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_responses: u64,
    /// Display order, stable across snapshots of the same poll.
    #[serde(default, deserialize_with = "null_as_default")]
    pub question_results: Vec<QuestionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub question_text: String,
    /// Canonical order as delivered. Use [`QuestionResult::ranked_answers`] for display.
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer_results: Vec<AnswerResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub answer_id: AnswerId,
    pub answer_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response_count: u64,
    /// Backend-computed share in `[0, 100]`; never recomputed here.
    #[serde(default, deserialize_with = "null_as_default")]
    pub percentage: f64,
}

impl PollResultSnapshot {
    pub fn question_count(&self) -> usize {
        self.question_results.len()
    }

    pub fn question(&self, index: usize) -> Option<&QuestionResult> {
        self.question_results.get(index)
    }
}

impl QuestionResult {
    /// Answers ordered by response count, highest first. Ties keep the
    /// delivered order. The canonical order is left untouched.
    pub fn ranked_answers(&self) -> Vec<&AnswerResult> {
        let mut ranked: Vec<&AnswerResult> = self.answer_results.iter().collect();
        ranked.sort_by(|a, b| b.response_count.cmp(&a.response_count));
        ranked
    }

    pub fn total_count(&self) -> u64 {
        self.answer_results.iter().map(|a| a.response_count).sum()
    }

    pub fn percentage_total(&self) -> f64 {
        self.answer_results.iter().map(|a| a.percentage).sum()
    }

    pub fn max_count(&self) -> u64 {
        self.answer_results
            .iter()
            .map(|a| a.response_count)
            .max()
            .unwrap_or(0)
    }
}
