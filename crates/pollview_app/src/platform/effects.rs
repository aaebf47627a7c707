use std::time::Duration;

use pollview_core::{Effect, FetchFailure, Msg};
use pollview_engine::{EngineEvent, EngineHandle};
use pollview_logging::{pv_debug, pv_info, pv_warn};

/// Runs core effects on the engine and turns engine events back into
/// messages for the dispatch loop.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match &effect {
                Effect::FetchResults {
                    activation,
                    poll_code,
                } => pv_info!("FetchResults activation={} code={}", activation, poll_code),
                Effect::Subscribe {
                    activation,
                    poll_code,
                } => pv_info!("Subscribe activation={} code={}", activation, poll_code),
                Effect::Unsubscribe { activation } => {
                    pv_info!("Unsubscribe activation={}", activation)
                }
            }
            self.engine.dispatch(effect);
        }
    }

    /// Next engine event as a message, waiting at most `timeout`.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(event_to_msg)
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}

pub(crate) fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::FetchCompleted { activation, result } => Msg::FetchCompleted {
            activation,
            result: result.map_err(|err| {
                pv_warn!("Results fetch for activation {} failed: {}", activation, err);
                FetchFailure::from(err)
            }),
        },
        EngineEvent::ChannelStatus { activation, status } => {
            pv_debug!("Channel activation={} status={:?}", activation, status);
            Msg::ChannelStatusChanged { activation, status }
        }
        EngineEvent::SnapshotPushed {
            activation,
            snapshot,
        } => Msg::SnapshotPushed {
            activation,
            snapshot,
        },
        EngineEvent::ChannelFailed { activation, error } => Msg::ChannelFailed {
            activation,
            reason: error.to_string(),
        },
    }
}
