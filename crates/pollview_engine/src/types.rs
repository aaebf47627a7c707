use std::fmt;
use std::time::Duration;

use pollview_core::{ActivationId, ConnectionState, FetchFailure, PollResultSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    FetchCompleted {
        activation: ActivationId,
        result: Result<PollResultSnapshot, FetchError>,
    },
    ChannelStatus {
        activation: ActivationId,
        status: ConnectionState,
    },
    SnapshotPushed {
        activation: ActivationId,
        snapshot: PollResultSnapshot,
    },
    ChannelFailed {
        activation: ActivationId,
        error: ChannelError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The backend does not know the poll code.
    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::NotFound
    }

    /// Network, timeout, non-success status or undecodable body.
    pub fn is_transport(&self) -> bool {
        !matches!(
            self.kind,
            FailureKind::NotFound | FailureKind::InvalidPollCode
        )
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

impl From<FetchError> for FetchFailure {
    fn from(err: FetchError) -> Self {
        let message = err.to_string();
        if err.is_transport() {
            FetchFailure::Transport { message }
        } else {
            FetchFailure::NotFound { message }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidPollCode,
    NotFound,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidPollCode => write!(f, "invalid poll code"),
            FailureKind::NotFound => write!(f, "poll not found"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("could not connect to live channel: {0}")]
    Connect(String),
    #[error("live channel handshake did not finish within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("broker reported an error: {0}")]
    Broker(String),
    #[error("unexpected frame from broker: {0}")]
    Protocol(String),
    #[error("live channel transport error: {0}")]
    Transport(String),
    #[error("live channel closed by remote")]
    Closed,
    #[error("no traffic from broker for {0:?}")]
    Silent(Duration),
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match err {
            Error::ConnectionClosed | Error::AlreadyClosed => ChannelError::Closed,
            other => ChannelError::Transport(other.to_string()),
        }
    }
}
