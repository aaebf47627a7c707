use std::collections::HashMap;
use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use pollview_core::{ActivationId, ConnectionState, Effect, PollResultSnapshot};
use pollview_logging::{pv_debug, pv_warn};
use tokio::runtime::{Handle, Runtime};

use crate::channel::{ChannelSink, LiveUpdateChannel, StompChannel, SubscriptionHandle};
use crate::fetch::{ReqwestResultsFetcher, ResultsFetcher};
use crate::settings::EngineSettings;
use crate::{ChannelError, EngineEvent};

/// How long shutdown waits for subscriptions to say goodbye to the broker.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    FetchResults {
        activation: ActivationId,
        poll_code: String,
    },
    Subscribe {
        activation: ActivationId,
        poll_code: String,
    },
    Unsubscribe {
        activation: ActivationId,
    },
    Shutdown,
}

impl From<Effect> for EngineCommand {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::FetchResults {
                activation,
                poll_code,
            } => EngineCommand::FetchResults {
                activation,
                poll_code,
            },
            Effect::Subscribe {
                activation,
                poll_code,
            } => EngineCommand::Subscribe {
                activation,
                poll_code,
            },
            Effect::Unsubscribe { activation } => EngineCommand::Unsubscribe { activation },
        }
    }
}

/// Front-end side of the IO worker. Commands go in, [`EngineEvent`]s come
/// out tagged with the activation that asked for them.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> io::Result<Self> {
        let fetcher: Arc<dyn ResultsFetcher> = Arc::new(ReqwestResultsFetcher::new(settings.api));
        let channel_settings = settings.channel;
        Self::with_backends(fetcher, move |runtime| {
            Arc::new(StompChannel::new(channel_settings, runtime)) as Arc<dyn LiveUpdateChannel>
        })
    }

    /// Builds the worker around caller-supplied backends. `make_channel`
    /// receives the worker's runtime handle.
    pub fn with_backends<F>(fetcher: Arc<dyn ResultsFetcher>, make_channel: F) -> io::Result<Self>
    where
        F: FnOnce(Handle) -> Arc<dyn LiveUpdateChannel>,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("pollview-io")
            .enable_all()
            .build()?;
        let channel = make_channel(runtime.handle().clone());

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("pollview-engine".to_string())
            .spawn(move || {
                let mut worker = Worker {
                    runtime,
                    fetcher,
                    channel,
                    event_tx,
                    subscriptions: HashMap::new(),
                };
                while let Ok(command) = cmd_rx.recv() {
                    if command == EngineCommand::Shutdown {
                        break;
                    }
                    worker.handle(command);
                }
                worker.shutdown();
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    pub fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            pv_warn!("engine worker is gone; command dropped");
        }
    }

    pub fn dispatch(&self, effect: Effect) {
        self.send(effect.into());
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Closes every live subscription and waits for the worker to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                pv_warn!("engine worker panicked during shutdown");
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    runtime: Runtime,
    fetcher: Arc<dyn ResultsFetcher>,
    channel: Arc<dyn LiveUpdateChannel>,
    event_tx: mpsc::Sender<EngineEvent>,
    subscriptions: HashMap<ActivationId, SubscriptionHandle>,
}

impl Worker {
    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::FetchResults {
                activation,
                poll_code,
            } => {
                let fetcher = self.fetcher.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = fetcher.fetch(&poll_code).await;
                    let _ = event_tx.send(EngineEvent::FetchCompleted { activation, result });
                });
            }
            EngineCommand::Subscribe {
                activation,
                poll_code,
            } => {
                let sink = Arc::new(ActivationSink {
                    activation,
                    event_tx: self.event_tx.clone(),
                });
                let handle = self.channel.subscribe(&poll_code, sink);
                if let Some(mut replaced) = self.subscriptions.insert(activation, handle) {
                    self.channel.unsubscribe(&mut replaced);
                }
            }
            EngineCommand::Unsubscribe { activation } => {
                match self.subscriptions.remove(&activation) {
                    Some(mut handle) => self.channel.unsubscribe(&mut handle),
                    None => pv_debug!("no subscription for activation {:?}", activation),
                }
            }
            EngineCommand::Shutdown => {}
        }
    }

    fn shutdown(mut self) {
        let tasks: Vec<_> = self
            .subscriptions
            .drain()
            .filter_map(|(_, mut handle)| handle.cancel())
            .collect();
        if !tasks.is_empty() {
            let closing = futures_util::future::join_all(tasks);
            if self
                .runtime
                .block_on(tokio::time::timeout(SHUTDOWN_GRACE, closing))
                .is_err()
            {
                pv_warn!("live channels did not close within {:?}", SHUTDOWN_GRACE);
            }
        }
        self.runtime.shutdown_timeout(SHUTDOWN_GRACE);
    }
}

/// Tags channel callbacks with their activation and forwards them as events.
struct ActivationSink {
    activation: ActivationId,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ChannelSink for ActivationSink {
    fn on_status(&self, status: ConnectionState) {
        let _ = self.event_tx.send(EngineEvent::ChannelStatus {
            activation: self.activation,
            status,
        });
    }

    fn on_snapshot(&self, snapshot: PollResultSnapshot) {
        let _ = self.event_tx.send(EngineEvent::SnapshotPushed {
            activation: self.activation,
            snapshot,
        });
    }

    fn on_error(&self, error: ChannelError) {
        let _ = self.event_tx.send(EngineEvent::ChannelFailed {
            activation: self.activation,
            error,
        });
    }
}
