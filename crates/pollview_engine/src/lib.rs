//! Pollview engine: HTTP and live-channel IO, plus effect execution.
mod api;
mod channel;
mod engine;
mod fetch;
mod persist;
mod settings;
mod stomp;
mod types;

pub use api::{ApiError, PollApi};
pub use channel::{
    ChannelSink, LiveMessage, LiveUpdateChannel, StompChannel, SubscriptionHandle,
};
pub use engine::{EngineCommand, EngineHandle};
pub use fetch::{ReqwestResultsFetcher, ResultsFetcher};
pub use persist::{ensure_state_dir, read_optional, AtomicFileWriter, PersistError};
pub use settings::{ApiSettings, ChannelSettings, EngineSettings, ResultsRoute};
pub use stomp::{Command, Frame, StompError};
pub use types::{ChannelError, EngineEvent, FailureKind, FetchError};
