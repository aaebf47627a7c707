use crate::ActivationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchResults {
        activation: ActivationId,
        poll_code: String,
    },
    Subscribe {
        activation: ActivationId,
        poll_code: String,
    },
    Unsubscribe { activation: ActivationId },
}
