use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pollview_core::{ConnectionState, PollResultSnapshot};
use pollview_engine::{
    ChannelError, ChannelSettings, ChannelSink, Command, Frame, LiveUpdateChannel, StompChannel,
};
use pretty_assertions::assert_eq;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Status(ConnectionState),
    Snapshot(u64),
    Error(ChannelError),
}

struct RecordingSink(UnboundedSender<Seen>);

impl ChannelSink for RecordingSink {
    fn on_status(&self, status: ConnectionState) {
        let _ = self.0.send(Seen::Status(status));
    }

    fn on_snapshot(&self, snapshot: PollResultSnapshot) {
        let _ = self.0.send(Seen::Snapshot(snapshot.total_responses));
    }

    fn on_error(&self, error: ChannelError) {
        let _ = self.0.send(Seen::Error(error));
    }
}

fn recording_sink() -> (Arc<dyn ChannelSink>, UnboundedReceiver<Seen>) {
    let (tx, rx) = unbounded_channel();
    (Arc::new(RecordingSink(tx)), rx)
}

async fn next_seen(rx: &mut UnboundedReceiver<Seen>) -> Seen {
    timeout(WAIT, rx.recv())
        .await
        .expect("sink event in time")
        .expect("sink still open")
}

#[derive(Clone)]
enum Script {
    Publish(Vec<String>),
    /// CONNECTED with CRLF line endings, then nothing.
    CrlfConnected,
    /// Promise heart-beats every this many ms, then never send any.
    GoQuiet(u64),
    CloseAfterSubscribe,
    RejectConnect,
    Silent,
}

struct Broker {
    addr: SocketAddr,
    frames: UnboundedReceiver<Frame>,
    connections: Arc<AtomicUsize>,
}

impl Broker {
    async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (frames_tx, frames) = unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, script.clone(), frames_tx.clone()));
            }
        });
        Self {
            addr,
            frames,
            connections,
        }
    }

    fn settings(&self) -> ChannelSettings {
        let base = Url::parse(&format!("http://{}/pollapi", self.addr)).unwrap();
        ChannelSettings::for_api_base(&base)
    }

    async fn next_frame(&mut self) -> Frame {
        timeout(WAIT, self.frames.recv())
            .await
            .expect("broker frame in time")
            .expect("broker still running")
    }
}

async fn read_frame(ws: &mut WebSocketStream<TcpStream>) -> Option<Frame> {
    while let Some(Ok(message)) = ws.next().await {
        if let Message::Text(text) = message {
            if let Ok(Some(frame)) = Frame::parse(text.as_str()) {
                return Some(frame);
            }
        }
    }
    None
}

async fn send(ws: &mut WebSocketStream<TcpStream>, frame: Frame) {
    let _ = ws.send(Message::text(frame.encode())).await;
}

fn connected(heart_beat: &str) -> String {
    Frame::new(Command::Connected)
        .header("version", "1.2")
        .header("heart-beat", heart_beat)
        .encode()
}

/// Answers CONNECT with `connected` and waits for the SUBSCRIBE.
async fn accept_subscription(
    ws: &mut WebSocketStream<TcpStream>,
    connected: String,
    frames: &UnboundedSender<Frame>,
) -> Option<Frame> {
    let _ = ws.send(Message::text(connected)).await;
    let subscribe = read_frame(ws).await?;
    let _ = frames.send(subscribe.clone());
    Some(subscribe)
}

async fn serve(stream: TcpStream, script: Script, frames: UnboundedSender<Frame>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    let Some(connect) = read_frame(&mut ws).await else {
        return;
    };
    let _ = frames.send(connect);

    match script {
        Script::Silent => {}
        Script::RejectConnect => {
            send(
                &mut ws,
                Frame::new(Command::Error).header("message", "access denied"),
            )
            .await;
        }
        Script::CrlfConnected => {
            let raw = "CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0".to_string();
            if accept_subscription(&mut ws, raw, &frames).await.is_none() {
                return;
            }
        }
        Script::GoQuiet(millis) => {
            let promise = format!("{millis},{millis}");
            if accept_subscription(&mut ws, connected(&promise), &frames).await.is_none() {
                return;
            }
        }
        Script::CloseAfterSubscribe => {
            if accept_subscription(&mut ws, connected("0,0"), &frames).await.is_some() {
                let _ = ws.close(None).await;
            }
            return;
        }
        Script::Publish(bodies) => {
            let Some(subscribe) = accept_subscription(&mut ws, connected("0,0"), &frames).await
            else {
                return;
            };
            let destination = subscribe.get("destination").unwrap_or_default().to_string();
            let id = subscribe.get("id").unwrap_or_default().to_string();
            for body in bodies {
                send(
                    &mut ws,
                    Frame::new(Command::Message)
                        .header("destination", destination.clone())
                        .header("subscription", id.clone())
                        .header("content-type", "application/json")
                        .with_body(body),
                )
                .await;
            }
        }
    }

    while let Some(frame) = read_frame(&mut ws).await {
        let _ = frames.send(frame);
    }
}

fn update(code: &str, total: u64) -> String {
    format!(
        r#"{{"type":"POLL_UPDATED","pollCode":"{code}","data":{{"pollId":1,"title":"Lunch","totalResponses":{total},"questionResults":[]}}}}"#
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn subscribes_and_forwards_updates_in_order() {
    let mut broker = Broker::start(Script::Publish(vec![
        update("poll42", 1),
        r#"{"type":"POLL_DELETED","pollCode":"poll42"}"#.to_string(),
        "{not json".to_string(),
        update("pollOTHER", 99),
        update("poll42", 2),
    ]))
    .await;
    let channel = StompChannel::new(broker.settings(), Handle::current());
    let (sink, mut seen) = recording_sink();

    let mut handle = channel.subscribe("poll42", sink);

    let connect = broker.next_frame().await;
    assert_eq!(connect.command, Command::Connect);
    assert_eq!(connect.get("heart-beat"), Some("20000,20000"));
    let subscribe = broker.next_frame().await;
    assert_eq!(subscribe.command, Command::Subscribe);
    assert_eq!(subscribe.get("destination"), Some("/topic/poll/poll42"));

    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connected));
    assert_eq!(next_seen(&mut seen).await, Seen::Snapshot(1));
    assert_eq!(next_seen(&mut seen).await, Seen::Snapshot(2));
    assert!(handle.is_active());

    channel.unsubscribe(&mut handle);
    assert!(!handle.is_active());
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Disconnected));

    let unsubscribe = broker.next_frame().await;
    assert_eq!(unsubscribe.command, Command::Unsubscribe);
    assert_eq!(unsubscribe.get("id"), subscribe.get("id"));
    assert_eq!(broker.next_frame().await.command, Command::Disconnect);

    // Second teardown is a no-op.
    channel.unsubscribe(&mut handle);
    assert!(timeout(Duration::from_millis(200), seen.recv())
        .await
        .map_or(true, |event| event.is_none()));
}

#[tokio::test(flavor = "multi_thread")]
async fn broker_error_on_connect_is_reported_once() {
    let broker = Broker::start(Script::RejectConnect).await;
    let channel = StompChannel::new(broker.settings(), Handle::current());
    let (sink, mut seen) = recording_sink();

    let _handle = channel.subscribe("poll42", sink);

    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert_eq!(
        next_seen(&mut seen).await,
        Seen::Error(ChannelError::Broker("access denied".into()))
    );
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Disconnected));
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_broker_hits_handshake_timeout_without_retry() {
    let broker = Broker::start(Script::Silent).await;
    let settings = ChannelSettings {
        handshake_timeout: Duration::from_millis(200),
        ..broker.settings()
    };
    let channel = StompChannel::new(settings, Handle::current());
    let (sink, mut seen) = recording_sink();

    let _handle = channel.subscribe("poll42", sink);

    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert_eq!(
        next_seen(&mut seen).await,
        Seen::Error(ChannelError::HandshakeTimeout(Duration::from_millis(200)))
    );
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Disconnected));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(broker.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_connection_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}/pollapi")).unwrap();
    let channel = StompChannel::new(ChannelSettings::for_api_base(&base), Handle::current());
    let (sink, mut seen) = recording_sink();
    let _handle = channel.subscribe("poll42", sink);

    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert!(matches!(next_seen(&mut seen).await, Seen::Error(ChannelError::Connect(_))));
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Disconnected));
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_handle_tears_down() {
    let mut broker = Broker::start(Script::Publish(vec![])).await;
    let channel = StompChannel::new(broker.settings(), Handle::current());
    let (sink, mut seen) = recording_sink();

    let handle = channel.subscribe("poll42", sink);
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connected));
    broker.next_frame().await;
    broker.next_frame().await;

    drop(handle);
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Disconnected));
    assert_eq!(broker.next_frame().await.command, Command::Unsubscribe);
}

#[tokio::test(flavor = "multi_thread")]
async fn crlf_connected_frame_completes_the_handshake() {
    let mut broker = Broker::start(Script::CrlfConnected).await;
    let channel = StompChannel::new(broker.settings(), Handle::current());
    let (sink, mut seen) = recording_sink();

    let _handle = channel.subscribe("poll42", sink);

    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connected));
    assert_eq!(broker.next_frame().await.command, Command::Connect);
    assert_eq!(broker.next_frame().await.command, Command::Subscribe);
}

#[tokio::test(flavor = "multi_thread")]
async fn broker_that_stops_beating_is_dropped() {
    let broker = Broker::start(Script::GoQuiet(200)).await;
    let settings = ChannelSettings {
        heartbeat: Duration::from_millis(200),
        ..broker.settings()
    };
    let channel = StompChannel::new(settings, Handle::current());
    let (sink, mut seen) = recording_sink();

    let _handle = channel.subscribe("poll42", sink);

    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connected));
    assert_eq!(
        next_seen(&mut seen).await,
        Seen::Error(ChannelError::Silent(Duration::from_millis(400)))
    );
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Disconnected));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(broker.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_close_after_connect_disconnects_without_retry() {
    let broker = Broker::start(Script::CloseAfterSubscribe).await;
    let channel = StompChannel::new(broker.settings(), Handle::current());
    let (sink, mut seen) = recording_sink();

    let _handle = channel.subscribe("poll42", sink);

    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connecting));
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Connected));
    assert_eq!(next_seen(&mut seen).await, Seen::Error(ChannelError::Closed));
    assert_eq!(next_seen(&mut seen).await, Seen::Status(ConnectionState::Disconnected));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(broker.connections.load(Ordering::SeqCst), 1);
}
