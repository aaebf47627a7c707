use crate::{AnswerId, ConnectionState, PollId, PollResultSnapshot, QuestionId, QuestionResult};

pub const LIVE_LABEL: &str = "LIVE";
pub const OFFLINE_LABEL: &str = "OFFLINE";

#[derive(Debug, Clone, PartialEq)]
pub struct LiveResultView {
    pub poll_code: Option<String>,
    pub connection: ConnectionState,
    pub is_live: bool,
    pub channel_error: Option<String>,
    pub display: ResultDisplay,
}

impl LiveResultView {
    pub fn live_label(&self) -> &'static str {
        if self.is_live {
            LIVE_LABEL
        } else {
            OFFLINE_LABEL
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultDisplay {
    /// Nothing activated yet.
    Idle,
    /// Activated, waiting for the first snapshot.
    Loading,
    /// The initial fetch failed and no snapshot ever arrived.
    Unavailable,
    Ready(PollResultsView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollResultsView {
    pub poll_id: PollId,
    pub title: String,
    pub chart_type: Option<String>,
    pub total_responses: u64,
    pub question_index: usize,
    pub question_count: usize,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub question: Option<QuestionView>,
}

impl PollResultsView {
    pub fn project(snapshot: &PollResultSnapshot, cursor: usize) -> Self {
        let question_count = snapshot.question_count();
        Self {
            poll_id: snapshot.poll_id,
            title: snapshot.title.clone(),
            chart_type: snapshot.chart_type.clone(),
            total_responses: snapshot.total_responses,
            question_index: cursor,
            question_count,
            can_go_back: cursor > 0,
            can_go_forward: cursor + 1 < question_count,
            question: snapshot.question(cursor).map(QuestionView::from_result),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub question_id: QuestionId,
    pub text: String,
    /// Ranked by response count, highest first.
    pub answers: Vec<AnswerRowView>,
}

impl QuestionView {
    pub fn from_result(question: &QuestionResult) -> Self {
        let max_count = question.max_count().max(1) as f64;
        let answers = question
            .ranked_answers()
            .into_iter()
            .map(|answer| AnswerRowView {
                answer_id: answer.answer_id,
                text: answer.answer_text.clone(),
                response_count: answer.response_count,
                percentage: answer.percentage,
                bar_fraction: answer.response_count as f64 / max_count,
            })
            .collect();
        Self {
            question_id: question.question_id,
            text: question.question_text.clone(),
            answers,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRowView {
    pub answer_id: AnswerId,
    pub text: String,
    pub response_count: u64,
    pub percentage: f64,
    /// Bar length relative to the leading answer, in `[0, 1]`.
    pub bar_fraction: f64,
}
