use crate::{ActivationId, ConnectionState, FetchFailure, PollResultSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Start watching a poll. Replaces any current activation.
    Activate { poll_code: String },
    /// Stop watching; the last snapshot stays visible.
    Deactivate,
    /// One-shot results request finished.
    FetchCompleted {
        activation: ActivationId,
        result: Result<PollResultSnapshot, FetchFailure>,
    },
    /// Full snapshot delivered by the live channel.
    SnapshotPushed {
        activation: ActivationId,
        snapshot: PollResultSnapshot,
    },
    /// Live channel lifecycle transition.
    ChannelStatusChanged {
        activation: ActivationId,
        status: ConnectionState,
    },
    /// Live channel could not connect or broke.
    ChannelFailed {
        activation: ActivationId,
        reason: String,
    },
    /// Move the question cursor by a relative amount.
    Navigate(isize),
    /// Jump to a question by index.
    NavigateTo(usize),
    /// Idle wakeup from the front end loop; changes nothing.
    Tick,
}
