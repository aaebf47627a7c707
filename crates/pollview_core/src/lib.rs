//! Pollview core: pure live-results state machine, view-model helpers and
//! the client-side validation rules shared by every front end.
mod effect;
mod msg;
mod poll;
mod serde_util;
mod session;
mod snapshot;
mod state;
mod submission;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use poll::{
    AdminDashboard, AnswerDefinition, AuthoringError, ChartTypeInfo, CreatePollRequest,
    Demographic, PollDefinition, PollDraft, PollStatus, PollStatusInfo, QuestionDefinition,
    QuestionDraft, QuestionRequest, UnknownPollStatus, DEFAULT_CHART_TYPE_ID,
};
pub use session::{AdminIdentity, ClientSession, JoinError, POLL_CODE_PREFIX};
pub use snapshot::{AnswerId, AnswerResult, PollId, PollResultSnapshot, QuestionId, QuestionResult};
pub use state::{ActivationId, ConnectionState, FetchFailure, LiveResultState};
pub use submission::{Demographics, ResponseAnswer, ResponseDraft, SubmitResponseRequest, ValidationError};
pub use update::update;
pub use view_model::{
    AnswerRowView, LiveResultView, PollResultsView, QuestionView, ResultDisplay, LIVE_LABEL,
    OFFLINE_LABEL,
};
