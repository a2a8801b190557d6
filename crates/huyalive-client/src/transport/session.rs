//! Chat socket session.
//!
//! Lifecycle: `Disconnected -> Connecting -> Joined -> Active -> Closed`.
//!
//! - `connect` opens the socket; `join` sends the join frame as the very first
//!   message, then splits the socket between two tasks.
//! - The heartbeat task owns the write half. It is the only writer once the
//!   session is active.
//! - The receive task owns the read half and feeds binary frames to the
//!   dispatcher. Whatever way it exits, it cancels the heartbeat task and
//!   moves the session to `Closed`.
//! - `close` cancels both tasks, waits for them and reports the terminal
//!   connection error, if the receive task ended on one.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use huyalive_core::error::{HuyaLiveError, Result};
use huyalive_core::protocol::messages::{join_frame, HEARTBEAT_FRAME};

use crate::dispatch::{Dispatcher, Layer};
use crate::transport::codec::{self, Inbound};

pub const DEFAULT_ENDPOINT: &str = "wss://cdnws.api.huya.com";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub close_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Joined,
    Active,
    Closed,
}

/// Current state plus an ordered feed of every transition.
///
/// `watch` keeps only the latest value; the broadcast feed keeps each step.
struct StateCell {
    current: watch::Sender<SessionState>,
    transitions: broadcast::Sender<SessionState>,
}

impl StateCell {
    fn new() -> Self {
        let (current, _) = watch::channel(SessionState::Disconnected);
        let (transitions, _) = broadcast::channel(16);
        Self {
            current,
            transitions,
        }
    }

    fn get(&self) -> SessionState {
        *self.current.borrow()
    }

    fn set(&self, next: SessionState) {
        let mut prev = next;
        let changed = self.current.send_if_modified(|s| {
            prev = *s;
            if *s == next {
                return false;
            }
            *s = next;
            true
        });
        if changed {
            tracing::debug!(?prev, ?next, "session state");
            let _ = self.transitions.send(next);
        }
    }
}

struct Tasks {
    heartbeat: JoinHandle<()>,
    receive: JoinHandle<Result<()>>,
}

impl Tasks {
    async fn join(self) -> Result<()> {
        if let Err(e) = self.heartbeat.await {
            tracing::warn!(error = %e, "heartbeat task failed");
        }
        match self.receive.await {
            Ok(r) => r,
            Err(e) => Err(HuyaLiveError::Internal(format!("receive task failed: {e}"))),
        }
    }
}

/// One chat socket. Not reusable: once `Closed`, create a new session.
pub struct Session {
    cfg: SessionConfig,
    dispatcher: Arc<Dispatcher>,
    state: Arc<StateCell>,
    cancel: CancellationToken,
    socket: Option<WsStream>,
    tasks: Option<Tasks>,
}

impl Session {
    pub fn new(cfg: SessionConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            cfg,
            dispatcher,
            state: Arc::new(StateCell::new()),
            cancel: CancellationToken::new(),
            socket: None,
            tasks: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Latest state only; intermediate states may be skipped.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.current.subscribe()
    }

    /// Every state change from now on, in order.
    pub fn transitions(&self) -> broadcast::Receiver<SessionState> {
        self.state.transitions.subscribe()
    }

    /// Resolves once the session is `Closed`, by `close` or by the remote.
    pub async fn closed(&self) {
        let mut rx = self.state.current.subscribe();
        let _ = rx.wait_for(|s| *s == SessionState::Closed).await;
    }

    fn set_state(&self, next: SessionState) {
        self.state.set(next);
    }

    fn require(&self, expected: SessionState, op: &str) -> Result<()> {
        let current = self.state();
        if current != expected {
            return Err(HuyaLiveError::InvalidState(format!(
                "{op} requires {expected:?}, session is {current:?}"
            )));
        }
        Ok(())
    }

    /// Opens the websocket. On failure the session stays `Disconnected`.
    pub async fn connect(&mut self, endpoint: &str) -> Result<()> {
        self.require(SessionState::Disconnected, "connect")?;

        let (ws, _resp) = match timeout(self.cfg.connect_timeout, connect_async(endpoint)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Err(HuyaLiveError::Connection(format!(
                    "connect {endpoint} failed: {e}"
                )))
            }
            Err(_) => {
                return Err(HuyaLiveError::Connection(format!(
                    "connect {endpoint} timed out"
                )))
            }
        };

        tracing::info!(endpoint, "chat socket connected");
        self.socket = Some(ws);
        self.set_state(SessionState::Connecting);
        Ok(())
    }

    /// Sends the join frame and starts the heartbeat and receive tasks.
    pub async fn join(&mut self, target_uid: i64, channel_id: i32) -> Result<()> {
        self.require(SessionState::Connecting, "join")?;
        let frame = join_frame(target_uid, channel_id)?;
        let Some(mut ws) = self.socket.take() else {
            return Err(HuyaLiveError::Internal("connected session has no socket".into()));
        };

        if let Err(e) = ws.send(Message::Binary(frame.to_vec())).await {
            self.set_state(SessionState::Closed);
            return Err(HuyaLiveError::Connection(format!("join send failed: {e}")));
        }
        self.set_state(SessionState::Joined);

        let (sink, source) = ws.split();
        let span = tracing::info_span!("danmaku_session", target_uid, channel_id);
        let metrics = self.dispatcher.metrics().clone();

        self.set_state(SessionState::Active);
        metrics.sessions_active.inc(&[]);
        tracing::info!(parent: &span, "joined room");

        let heartbeat = tokio::spawn(
            heartbeat_loop(sink, self.cfg.clone(), self.cancel.clone(), self.dispatcher.clone())
                .instrument(span.clone()),
        );
        let receive = tokio::spawn(
            receive_loop(
                source,
                self.dispatcher.clone(),
                self.cancel.clone(),
                self.state.clone(),
            )
            .instrument(span),
        );
        self.tasks = Some(Tasks { heartbeat, receive });
        Ok(())
    }

    /// Ends the session from any state. Safe to call repeatedly.
    ///
    /// Returns the connection error that ended the receive task, if any; later
    /// calls return `Ok(())`.
    pub async fn close(&mut self) -> Result<()> {
        self.cancel.cancel();

        let result = match self.tasks.take() {
            Some(tasks) => tasks.join().await,
            None => {
                if let Some(mut ws) = self.socket.take() {
                    if timeout(self.cfg.close_timeout, ws.close(None)).await.is_err() {
                        tracing::debug!("close handshake timed out");
                    }
                }
                Ok(())
            }
        };

        if self.state() != SessionState::Closed {
            tracing::info!("session closed");
        }
        self.set_state(SessionState::Closed);
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn heartbeat_loop(
    mut sink: WsSink,
    cfg: SessionConfig,
    cancel: CancellationToken,
    dispatcher: Arc<Dispatcher>,
) {
    let metrics = dispatcher.metrics();
    let every = cfg.heartbeat_interval;
    let mut tick = interval_at(Instant::now() + every, every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                match sink.send(Message::Binary(HEARTBEAT_FRAME.to_vec())).await {
                    Ok(()) => {
                        tracing::trace!("heartbeat sent");
                        metrics.heartbeats.inc(&[("result", "ok")]);
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "heartbeat send failed");
                        metrics.heartbeats.inc(&[("result", "error")]);
                    }
                }
            }
        }
    }

    match timeout(cfg.close_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "write half close failed"),
        Err(_) => tracing::debug!("write half close timed out"),
    }
}

async fn receive_loop(
    mut source: WsSource,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
    state: Arc<StateCell>,
) -> Result<()> {
    // Any exit stops the heartbeat task.
    let _stop_heartbeat = cancel.clone().drop_guard();
    let metrics = dispatcher.metrics().clone();

    let result = loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            next = source.next() => next,
        };
        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => break Err(HuyaLiveError::Connection(format!("receive failed: {e}"))),
            None => break Err(HuyaLiveError::Connection("stream ended".into())),
        };

        metrics.frames_received.inc(&[("kind", codec::kind(&msg))]);
        match codec::decode(msg) {
            Ok(Inbound::Packet(packet)) => {
                let dispatched = tokio::select! {
                    _ = cancel.cancelled() => break Ok(()),
                    r = dispatcher.dispatch(packet) => r,
                };
                if dispatched.is_err() {
                    tracing::info!("event sink closed, stopping receive");
                    break Ok(());
                }
            }
            Ok(Inbound::Control) => {}
            Ok(Inbound::Close(reason)) => {
                let reason = reason.unwrap_or_else(|| "no reason".into());
                break Err(HuyaLiveError::Connection(format!("closed by remote: {reason}")));
            }
            Err(e) => dispatcher.record_decode_failure(Layer::Outer, &e),
        }
    };

    if let Err(e) = &result {
        tracing::warn!(error = %e, "chat socket lost");
    }
    metrics.sessions_active.dec(&[]);
    state.set(SessionState::Closed);
    result
}
