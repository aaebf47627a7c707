use pollview_logging::{pv_debug, pv_info, pv_warn};

use crate::view_model::{LiveResultView, PollResultsView, ResultDisplay};
use crate::PollResultSnapshot;

/// Identifies one `Activate .. Deactivate` span. Results tagged with an older
/// id are stale and dropped.
pub type ActivationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Why the one-shot results request failed. Both kinds collapse into one
/// user-visible state; the distinction only feeds the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    NotFound { message: String },
    Transport { message: String },
}

impl FetchFailure {
    pub fn message(&self) -> &str {
        match self {
            FetchFailure::NotFound { message } | FetchFailure::Transport { message } => message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Activation {
    id: ActivationId,
    /// Set once the channel has delivered a snapshot; a fetch landing after
    /// that is older than what we show.
    streamed: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveResultState {
    last_activation: ActivationId,
    active: Option<Activation>,
    poll_code: Option<String>,
    snapshot: Option<PollResultSnapshot>,
    fetch_failed: bool,
    channel_error: Option<String>,
    connection: ConnectionState,
    cursor: usize,
    dirty: bool,
}

impl LiveResultState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> LiveResultView {
        let display = match (&self.snapshot, self.fetch_failed, self.active) {
            (Some(snapshot), _, _) => {
                ResultDisplay::Ready(PollResultsView::project(snapshot, self.cursor))
            }
            (None, true, _) => ResultDisplay::Unavailable,
            (None, false, Some(_)) => ResultDisplay::Loading,
            (None, false, None) => ResultDisplay::Idle,
        };

        LiveResultView {
            poll_code: self.poll_code.clone(),
            connection: self.connection,
            is_live: self.connection == ConnectionState::Connected,
            channel_error: self.channel_error.clone(),
            display,
        }
    }

    pub fn snapshot(&self) -> Option<&PollResultSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn poll_code(&self) -> Option<&str> {
        self.poll_code.as_deref()
    }

    pub fn active_activation(&self) -> Option<ActivationId> {
        self.active.map(|a| a.id)
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Begins a new activation for `poll_code` and returns
    /// `(new_id, previous_id)`.
    pub(crate) fn activate(&mut self, poll_code: &str) -> (ActivationId, Option<ActivationId>) {
        let previous = self.active.take().map(|a| a.id);
        let same_poll = self.poll_code.as_deref() == Some(poll_code);
        if !same_poll {
            self.poll_code = Some(poll_code.to_string());
            self.snapshot = None;
            self.cursor = 0;
        }

        self.last_activation += 1;
        let id = self.last_activation;
        self.active = Some(Activation {
            id,
            streamed: false,
        });
        self.fetch_failed = false;
        self.channel_error = None;
        self.connection = ConnectionState::Connecting;
        self.mark_dirty();
        pv_info!(
            "activate poll_code={} activation={} replaced={:?}",
            poll_code,
            id,
            previous
        );
        (id, previous)
    }

    pub(crate) fn deactivate(&mut self) -> Option<ActivationId> {
        let previous = self.active.take()?;
        self.connection = ConnectionState::Disconnected;
        self.mark_dirty();
        pv_info!("deactivate activation={}", previous.id);
        Some(previous.id)
    }

    fn current(&mut self, activation: ActivationId, what: &str) -> Option<&mut Activation> {
        match self.active.as_mut() {
            Some(active) if active.id == activation => Some(active),
            _ => {
                pv_debug!("dropping stale {} for activation={}", what, activation);
                None
            }
        }
    }

    pub(crate) fn apply_fetch_success(
        &mut self,
        activation: ActivationId,
        snapshot: PollResultSnapshot,
    ) {
        let Some(active) = self.current(activation, "fetch result") else {
            return;
        };
        if active.streamed {
            pv_debug!(
                "fetch result for activation={} arrived after a streamed snapshot; keeping streamed",
                activation
            );
            return;
        }
        self.install(snapshot);
    }

    pub(crate) fn apply_fetch_failure(&mut self, activation: ActivationId, failure: FetchFailure) {
        if self.current(activation, "fetch failure").is_none() {
            return;
        }
        match &failure {
            FetchFailure::NotFound { message } => {
                pv_warn!("results fetch: poll not found ({})", message)
            }
            FetchFailure::Transport { message } => {
                pv_warn!("results fetch: transport failure ({})", message)
            }
        }
        if self.snapshot.is_some() {
            pv_debug!("keeping existing snapshot after fetch failure");
            return;
        }
        if !self.fetch_failed {
            self.fetch_failed = true;
            self.mark_dirty();
        }
    }

    pub(crate) fn apply_pushed(&mut self, activation: ActivationId, snapshot: PollResultSnapshot) {
        let Some(active) = self.current(activation, "pushed snapshot") else {
            return;
        };
        active.streamed = true;
        self.install(snapshot);
    }

    pub(crate) fn apply_status(&mut self, activation: ActivationId, status: ConnectionState) {
        if self.current(activation, "channel status").is_none() {
            return;
        }
        if status == ConnectionState::Connected {
            self.channel_error = None;
        }
        if self.connection != status {
            pv_debug!(
                "connection {:?} -> {:?} activation={}",
                self.connection,
                status,
                activation
            );
            self.connection = status;
            self.mark_dirty();
        }
    }

    pub(crate) fn apply_channel_failure(&mut self, activation: ActivationId, reason: String) {
        if self.current(activation, "channel failure").is_none() {
            return;
        }
        pv_warn!("live channel failed activation={}: {}", activation, reason);
        self.connection = ConnectionState::Disconnected;
        self.channel_error = Some(reason);
        self.mark_dirty();
    }

    /// Moves the cursor by `delta`, clamped to the question range.
    pub(crate) fn navigate(&mut self, delta: isize) {
        let len = self.question_count();
        if len == 0 {
            return;
        }
        let target = self.cursor.saturating_add_signed(delta).min(len - 1);
        self.move_cursor(target);
    }

    pub(crate) fn navigate_to(&mut self, index: usize) {
        if index < self.question_count() {
            self.move_cursor(index);
        }
    }

    fn question_count(&self) -> usize {
        self.snapshot
            .as_ref()
            .map(PollResultSnapshot::question_count)
            .unwrap_or(0)
    }

    fn move_cursor(&mut self, target: usize) {
        if target != self.cursor {
            self.cursor = target;
            self.mark_dirty();
        }
    }

    fn install(&mut self, snapshot: PollResultSnapshot) {
        let last = snapshot.question_count().saturating_sub(1);
        if self.cursor > last {
            self.cursor = last;
        }
        self.snapshot = Some(snapshot);
        self.fetch_failed = false;
        self.mark_dirty();
    }
}
