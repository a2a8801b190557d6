//! End-to-end session tests against a local websocket server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use huyalive_client::{ChatEvent, ClientMetrics, Dispatcher, Session, SessionConfig, SessionState};
use huyalive_core::protocol::messages::{
    join_frame, ChatMessage, OuterPacket, PushMessage, Sender, HEARTBEAT_FRAME, MSG_TYPE_PUSH,
    URI_CHAT_NOTICE,
};
use huyalive_core::protocol::tars::TarsMessage;

const WAIT: Duration = Duration::from_secs(5);

/// Accepts one client, records its binary frames and forwards queued messages to it.
struct Server {
    url: String,
    frames: mpsc::UnboundedReceiver<Vec<u8>>,
    to_client: mpsc::UnboundedSender<Message>,
}

impl Server {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (frames_tx, frames) = mpsc::unbounded_channel();
        let (to_client, mut outbound) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            let (mut tx, mut rx) = ws.split();
            loop {
                tokio::select! {
                    out = outbound.recv() => {
                        let Some(m) = out else { break };
                        if tx.send(m).await.is_err() {
                            break;
                        }
                    }
                    incoming = rx.next() => match incoming {
                        Some(Ok(Message::Binary(b))) => {
                            let _ = frames_tx.send(b);
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            frames,
            to_client,
        }
    }

    fn send(&self, msg: Message) {
        self.to_client.send(msg).unwrap();
    }

    async fn next_frame(&mut self) -> Vec<u8> {
        timeout(WAIT, self.frames.recv()).await.unwrap().unwrap()
    }

    fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Ok(f) = self.frames.try_recv() {
            out.push(f);
        }
        out
    }
}

fn chat_frame(nickname: &str, content: &str) -> Message {
    let chat = ChatMessage {
        sender: Sender {
            nickname: nickname.to_owned(),
            ..Sender::default()
        },
        content: content.to_owned(),
        ..ChatMessage::default()
    };
    let push = PushMessage {
        uri: URI_CHAT_NOTICE,
        msg: chat.encode().unwrap(),
        ..PushMessage::default()
    };
    let outer = OuterPacket {
        msg_type: MSG_TYPE_PUSH,
        payload: push.encode().unwrap(),
    };
    Message::Binary(outer.encode().unwrap().to_vec())
}

fn session(cfg: SessionConfig) -> (Session, mpsc::Receiver<ChatEvent>, Arc<ClientMetrics>) {
    let (tx, rx) = mpsc::channel(16);
    let metrics = Arc::new(ClientMetrics::default());
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(tx), metrics.clone()));
    (Session::new(cfg, dispatcher), rx, metrics)
}

#[tokio::test]
async fn join_then_chat_frame_yields_exactly_one_event() {
    let mut server = Server::start().await;
    let (mut s, mut events, metrics) = session(SessionConfig::default());

    s.connect(&server.url).await.unwrap();
    assert_eq!(s.state(), SessionState::Connecting);
    s.join(12345, 67890).await.unwrap();
    assert_eq!(s.state(), SessionState::Active);
    assert_eq!(metrics.sessions_active.get(&[]), 1);

    let first = server.next_frame().await;
    assert_eq!(first, join_frame(12345, 67890).unwrap().to_vec());

    server.send(chat_frame("Alice", "hello"));
    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.sender_name, "Alice");
    assert_eq!(event.content, "hello");

    s.close().await.unwrap();
    assert_eq!(s.state(), SessionState::Closed);
    assert!(events.try_recv().is_err());
    assert_eq!(metrics.events_emitted.get(&[]), 1);
    assert_eq!(metrics.sessions_active.get(&[]), 0);
}

#[tokio::test]
async fn every_transition_is_published_in_order() {
    let mut server = Server::start().await;
    let (mut s, _events, _) = session(SessionConfig::default());
    let mut transitions = s.transitions();

    s.connect(&server.url).await.unwrap();
    s.join(1, 1).await.unwrap();
    let _join = server.next_frame().await;
    s.close().await.unwrap();
    s.close().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(state) = transitions.try_recv() {
        seen.push(state);
    }
    assert_eq!(
        seen,
        [
            SessionState::Connecting,
            SessionState::Joined,
            SessionState::Active,
            SessionState::Closed,
        ]
    );
}

#[tokio::test]
async fn malformed_and_control_frames_do_not_end_the_session() {
    let server = Server::start().await;
    let (mut s, mut events, metrics) = session(SessionConfig::default());
    s.connect(&server.url).await.unwrap();
    s.join(1, 1).await.unwrap();

    server.send(Message::Binary(vec![0xff, 0x00]));
    server.send(Message::Text("not binary".into()));
    server.send(Message::Ping(vec![1, 2, 3]));
    server.send(chat_frame("Bob", "still here"));

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.content, "still here");
    assert_eq!(s.state(), SessionState::Active);
    assert_eq!(metrics.decode_errors.get(&[("layer", "outer")]), 1);
    assert_eq!(metrics.frames_received.get(&[("kind", "text")]), 1);

    s.close().await.unwrap();
}

#[tokio::test]
async fn close_before_connect_is_terminal() {
    let (mut s, _events, _) = session(SessionConfig::default());
    s.close().await.unwrap();
    assert_eq!(s.state(), SessionState::Closed);

    let err = s.connect("ws://127.0.0.1:9").await.unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_STATE");
    let err = s.join(1, 1).await.unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_STATE");
}

#[tokio::test]
async fn join_requires_connect() {
    let (mut s, _events, _) = session(SessionConfig::default());
    let err = s.join(1, 1).await.unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_STATE");
    assert_eq!(s.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn double_close_is_idempotent() {
    let server = Server::start().await;
    let (mut s, _events, _) = session(SessionConfig::default());
    s.connect(&server.url).await.unwrap();
    s.join(1, 1).await.unwrap();

    s.close().await.unwrap();
    s.close().await.unwrap();
    assert_eq!(s.state(), SessionState::Closed);
}

#[tokio::test]
async fn heartbeats_stop_after_close() {
    let mut server = Server::start().await;
    let cfg = SessionConfig {
        heartbeat_interval: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let (mut s, _events, metrics) = session(cfg);
    s.connect(&server.url).await.unwrap();
    s.join(1, 1).await.unwrap();
    let _join = server.next_frame().await;

    let hb = server.next_frame().await;
    assert_eq!(hb, HEARTBEAT_FRAME);
    sleep(Duration::from_millis(120)).await;

    s.close().await.unwrap();
    sleep(Duration::from_millis(100)).await;
    let before_close = server.drain();
    assert!(before_close.iter().all(|f| f == HEARTBEAT_FRAME));
    assert!(metrics.heartbeats.get(&[("result", "ok")]) >= 2);

    sleep(Duration::from_millis(250)).await;
    assert!(server.drain().is_empty(), "heartbeat sent after close");
}

#[tokio::test]
async fn remote_close_ends_session_with_connection_error() {
    let server = Server::start().await;
    let (mut s, _events, metrics) = session(SessionConfig::default());
    s.connect(&server.url).await.unwrap();
    s.join(1, 1).await.unwrap();

    server.send(Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "bye".into(),
    })));
    timeout(WAIT, s.closed()).await.unwrap();
    assert_eq!(s.state(), SessionState::Closed);
    assert_eq!(metrics.sessions_active.get(&[]), 0);

    let err = s.close().await.unwrap_err();
    assert_eq!(err.code().as_str(), "CONNECTION");
    s.close().await.unwrap();
}

#[tokio::test]
async fn dropped_event_receiver_ends_session_quietly() {
    let server = Server::start().await;
    let (mut s, events, _) = session(SessionConfig::default());
    s.connect(&server.url).await.unwrap();
    s.join(1, 1).await.unwrap();

    drop(events);
    server.send(chat_frame("Alice", "hello"));
    timeout(WAIT, s.closed()).await.unwrap();
    s.close().await.unwrap();
}

#[tokio::test]
async fn connect_failure_stays_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (mut s, _events, _) = session(SessionConfig::default());
    let err = s.connect(&format!("ws://{addr}")).await.unwrap_err();
    assert_eq!(err.code().as_str(), "CONNECTION");
    assert_eq!(s.state(), SessionState::Disconnected);
}
