//! Live results over STOMP on a raw WebSocket.
//!
//! Every subscription owns one connection and one task. The task reports
//! through a [`ChannelSink`] strictly in arrival order and never retries;
//! reconnecting means subscribing again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pollview_core::{ConnectionState, PollResultSnapshot};
use pollview_logging::{pv_debug, pv_info, pv_trace, pv_warn};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::settings::ChannelSettings;
use crate::stomp::{incoming_heartbeat, outgoing_heartbeat, Command, Frame};
use crate::ChannelError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receives what one subscription observes. Calls for one subscription are
/// never concurrent.
pub trait ChannelSink: Send + Sync {
    fn on_status(&self, status: ConnectionState);
    fn on_snapshot(&self, snapshot: PollResultSnapshot);
    fn on_error(&self, error: ChannelError);
}

pub trait LiveUpdateChannel: Send + Sync {
    fn subscribe(&self, poll_code: &str, sink: Arc<dyn ChannelSink>) -> SubscriptionHandle;

    /// Tears the subscription down. Inert handles are left alone.
    fn unsubscribe(&self, handle: &mut SubscriptionHandle) {
        let _ = handle.cancel();
    }
}

/// Envelope published on `/topic/poll/{pollCode}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum LiveMessage {
    #[serde(rename = "POLL_UPDATED")]
    PollUpdated {
        #[serde(rename = "pollCode", default)]
        poll_code: Option<String>,
        data: PollResultSnapshot,
    },
    #[serde(other)]
    Ignored,
}

/// Owner side of one subscription. Dropping a live handle cancels it.
#[derive(Debug, Default)]
pub struct SubscriptionHandle {
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn new(cancel: CancellationToken, task: Option<JoinHandle<()>>) -> Self {
        Self {
            cancel: Some(cancel),
            task,
        }
    }

    /// A handle that was never connected; cancelling it does nothing.
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        let live_token = self.cancel.as_ref().is_some_and(|c| !c.is_cancelled());
        let live_task = self.task.as_ref().map_or(true, |t| !t.is_finished());
        live_token && live_task
    }

    /// Signals teardown and hands back the task so callers may await it.
    /// Returns `None` once the handle is inert.
    pub fn cancel(&mut self) -> Option<JoinHandle<()>> {
        let token = self.cancel.take()?;
        token.cancel();
        self.task.take()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

pub struct StompChannel {
    settings: ChannelSettings,
    runtime: Handle,
    next_id: AtomicU64,
}

impl StompChannel {
    pub fn new(settings: ChannelSettings, runtime: Handle) -> Self {
        Self {
            settings,
            runtime,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }
}

impl LiveUpdateChannel for StompChannel {
    fn subscribe(&self, poll_code: &str, sink: Arc<dyn ChannelSink>) -> SubscriptionHandle {
        let subscription = Subscription {
            id: format!("sub-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            poll_code: poll_code.trim().to_string(),
            settings: self.settings.clone(),
            sink,
        };
        let cancel = CancellationToken::new();
        let task = self.runtime.spawn(subscription.run(cancel.clone()));
        SubscriptionHandle::new(cancel, Some(task))
    }
}

struct Subscription {
    id: String,
    poll_code: String,
    settings: ChannelSettings,
    sink: Arc<dyn ChannelSink>,
}

enum Exit {
    Cancelled,
    Failed(ChannelError),
}

/// Heart-beat intervals agreed in the CONNECTED frame.
#[derive(Debug, Clone, Copy)]
struct HeartBeats {
    outgoing: Option<Duration>,
    incoming: Option<Duration>,
}

impl Subscription {
    async fn run(self, cancel: CancellationToken) {
        self.sink.on_status(ConnectionState::Connecting);
        let window = self.settings.handshake_timeout;

        let handshake = tokio::select! {
            _ = cancel.cancelled() => {
                self.sink.on_status(ConnectionState::Disconnected);
                return;
            }
            outcome = time::timeout(window, self.handshake()) => outcome,
        };
        let (mut ws, heartbeats) = match handshake {
            Ok(Ok(connected)) => connected,
            Ok(Err(err)) => return self.fail(err),
            Err(_) => return self.fail(ChannelError::HandshakeTimeout(window)),
        };

        pv_info!("live channel for {} connected ({})", self.poll_code, self.id);
        self.sink.on_status(ConnectionState::Connected);

        match self.pump(&mut ws, heartbeats, &cancel).await {
            Exit::Cancelled => {
                self.close(&mut ws).await;
                self.sink.on_status(ConnectionState::Disconnected);
            }
            Exit::Failed(err) => self.fail(err),
        }
    }

    async fn handshake(&self) -> Result<(WsStream, HeartBeats), ChannelError> {
        let url = self.settings.ws_url.as_str();
        pv_debug!("opening live channel {} for {}", url, self.poll_code);
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;

        let host = self.settings.ws_url.host_str().unwrap_or("localhost");
        send_frame(&mut ws, &Frame::connect(host, self.settings.heartbeat)).await?;

        loop {
            let Some(message) = ws.next().await else {
                return Err(ChannelError::Closed);
            };
            let Some(frame) = decode_frame(message?)? else {
                continue;
            };
            match frame.command {
                Command::Connected => {
                    let heartbeats = HeartBeats {
                        outgoing: outgoing_heartbeat(self.settings.heartbeat, &frame),
                        incoming: incoming_heartbeat(self.settings.heartbeat, &frame),
                    };
                    let topic = self.settings.topic(&self.poll_code);
                    send_frame(&mut ws, &Frame::subscribe(&self.id, &topic)).await?;
                    return Ok((ws, heartbeats));
                }
                Command::Error => return Err(ChannelError::Broker(broker_reason(&frame))),
                other => {
                    return Err(ChannelError::Protocol(format!(
                        "expected CONNECTED, got {other}"
                    )))
                }
            }
        }
    }

    async fn pump(
        &self,
        ws: &mut WsStream,
        heartbeats: HeartBeats,
        cancel: &CancellationToken,
    ) -> Exit {
        let mut ticker = heartbeats
            .outgoing
            .map(|period| time::interval_at(Instant::now() + period, period));
        // The broker counts as gone after two missed beats.
        let silence_limit = heartbeats.incoming.map(|period| period * 2);
        let mut last_heard = Instant::now();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Exit::Cancelled,
                _ = next_beat(&mut ticker) => {
                    if let Err(err) = ws.send(Message::text("\n")).await {
                        return Exit::Failed(err.into());
                    }
                }
                _ = silence(silence_limit, last_heard) => {
                    if let Some(limit) = silence_limit {
                        return Exit::Failed(ChannelError::Silent(limit));
                    }
                }
                message = ws.next() => {
                    last_heard = Instant::now();
                    let frame = match message {
                        None => return Exit::Failed(ChannelError::Closed),
                        Some(Err(err)) => return Exit::Failed(err.into()),
                        Some(Ok(message)) => match decode_frame(message) {
                            Ok(Some(frame)) => frame,
                            Ok(None) => continue,
                            Err(err) => return Exit::Failed(err),
                        },
                    };
                    match frame.command {
                        Command::Message => self.deliver(&frame.body),
                        Command::Error => {
                            return Exit::Failed(ChannelError::Broker(broker_reason(&frame)))
                        }
                        Command::Receipt => {}
                        other => pv_debug!("ignoring {} frame on {}", other, self.id),
                    }
                }
            }
        }
    }

    fn deliver(&self, body: &str) {
        match serde_json::from_str::<LiveMessage>(body) {
            Ok(LiveMessage::PollUpdated { poll_code, data }) => {
                if let Some(code) = poll_code.as_deref() {
                    if code != self.poll_code {
                        pv_warn!(
                            "dropping update for {} on the {} subscription",
                            code,
                            self.poll_code
                        );
                        return;
                    }
                }
                self.sink.on_snapshot(data);
            }
            Ok(LiveMessage::Ignored) => pv_trace!("ignoring live message on {}", self.id),
            Err(err) => pv_warn!("malformed live message for {}: {}", self.poll_code, err),
        }
    }

    async fn close(&self, ws: &mut WsStream) {
        for frame in [Frame::unsubscribe(&self.id), Frame::disconnect()] {
            if let Err(err) = send_frame(ws, &frame).await {
                pv_debug!("{} while closing {}: {}", frame.command, self.id, err);
                break;
            }
        }
        if let Err(err) = ws.close(None).await {
            pv_debug!("websocket close for {} failed: {}", self.id, err);
        }
        pv_info!("live channel for {} closed ({})", self.poll_code, self.id);
    }

    fn fail(&self, err: ChannelError) {
        pv_warn!("live channel for {} failed: {}", self.poll_code, err);
        self.sink.on_error(err);
        self.sink.on_status(ConnectionState::Disconnected);
    }
}

async fn send_frame(ws: &mut WsStream, frame: &Frame) -> Result<(), ChannelError> {
    ws.send(Message::text(frame.encode())).await?;
    Ok(())
}

/// `Ok(None)` for heart-beats and control messages.
fn decode_frame(message: Message) -> Result<Option<Frame>, ChannelError> {
    let frame = match message {
        Message::Text(text) => Frame::parse(text.as_str()),
        Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
            Ok(text) => Frame::parse(text),
            Err(err) => return Err(ChannelError::Protocol(err.to_string())),
        },
        Message::Close(_) => return Err(ChannelError::Closed),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Ok(None),
    };
    frame.map_err(|err| ChannelError::Protocol(err.to_string()))
}

fn broker_reason(frame: &Frame) -> String {
    match frame.get("message") {
        Some(message) if !message.is_empty() => message.to_string(),
        _ if !frame.body.trim().is_empty() => frame.body.trim().to_string(),
        _ => "no details".to_string(),
    }
}

/// Resolves once nothing has arrived for `limit` since `last_heard`.
async fn silence(limit: Option<Duration>, last_heard: Instant) {
    match limit {
        Some(limit) => time::sleep_until(last_heard + limit).await,
        None => std::future::pending::<()>().await,
    }
}

async fn next_beat(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
