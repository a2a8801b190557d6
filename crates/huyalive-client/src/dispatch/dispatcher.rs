use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use huyalive_core::error::{DecodeError, HuyaLiveError, Result};
use huyalive_core::protocol::messages::{
    ChatMessage, OuterPacket, PushMessage, MSG_TYPE_PUSH, URI_CHAT_NOTICE,
};
use huyalive_core::protocol::tars::TarsMessage;

use crate::obs::metrics::ClientMetrics;

/// Shown when a sender has no nickname.
pub const ANONYMOUS: &str = "匿名";

const WHITE: &str = "ffffff";

/// Normalized chat event handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub sender_name: String,
    pub content: String,
    pub sender_uid: i64,
    /// Lowercase 6-digit RGB hex.
    pub color: String,
}

impl ChatEvent {
    /// `None` for notices without text.
    pub fn from_message(msg: ChatMessage) -> Option<Self> {
        if msg.content.is_empty() {
            return None;
        }
        let sender_name = if msg.sender.nickname.is_empty() {
            ANONYMOUS.to_owned()
        } else {
            msg.sender.nickname
        };
        let color = match msg.bullet_format.font_color {
            c if c <= 0 => WHITE.to_owned(),
            c => format!("{c:06x}"),
        };
        Some(Self {
            sender_name,
            content: msg.content,
            sender_uid: msg.sender.uid,
            color,
        })
    }
}

/// Caller-side consumer of chat events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// `Err(SinkClosed)` once the consumer is gone.
    async fn emit(&self, event: ChatEvent) -> Result<()>;
}

#[async_trait]
impl EventSink for mpsc::Sender<ChatEvent> {
    async fn emit(&self, event: ChatEvent) -> Result<()> {
        self.send(event).await.map_err(|_| HuyaLiveError::SinkClosed)
    }
}

/// Adapts a plain callback into an `EventSink`.
pub struct FnSink<F>(pub F);

#[async_trait]
impl<F> EventSink for FnSink<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    async fn emit(&self, event: ChatEvent) -> Result<()> {
        (self.0)(event);
        Ok(())
    }
}

/// Envelope layer of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Outer,
    Push,
    Chat,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Outer => "outer",
            Layer::Push => "push",
            Layer::Chat => "chat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} layer: {error}", .layer.as_str())]
pub struct LayerError {
    pub layer: Layer,
    pub error: DecodeError,
}

/// Why a well-formed frame produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MsgType(i32),
    Uri(i32),
    EmptyContent,
}

impl IgnoreReason {
    /// Metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            IgnoreReason::MsgType(_) => "msg_type",
            IgnoreReason::Uri(_) => "uri",
            IgnoreReason::EmptyContent => "empty_content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Chat(ChatEvent),
    Ignored(IgnoreReason),
    Malformed(LayerError),
}

/// Turns decoded outer packets into chat events for one sink.
pub struct Dispatcher {
    sink: Arc<dyn EventSink>,
    metrics: Arc<ClientMetrics>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn EventSink>, metrics: Arc<ClientMetrics>) -> Self {
        Self { sink, metrics }
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    /// Pure classification of one outer packet; decodes the inner layers.
    pub fn classify(packet: &OuterPacket) -> Classification {
        if packet.msg_type != MSG_TYPE_PUSH {
            return Classification::Ignored(IgnoreReason::MsgType(packet.msg_type));
        }
        let push = match PushMessage::decode(packet.payload.clone()) {
            Ok(p) => p,
            Err(error) => {
                return Classification::Malformed(LayerError {
                    layer: Layer::Push,
                    error,
                })
            }
        };
        if push.uri != URI_CHAT_NOTICE {
            return Classification::Ignored(IgnoreReason::Uri(push.uri));
        }
        // Notices without a sender or bullet format still carry text.
        match ChatMessage::decode_with_defaults(push.msg) {
            Ok(msg) => match ChatEvent::from_message(msg) {
                Some(event) => Classification::Chat(event),
                None => Classification::Ignored(IgnoreReason::EmptyContent),
            },
            Err(error) => Classification::Malformed(LayerError {
                layer: Layer::Chat,
                error,
            }),
        }
    }

    /// Classifies `packet` and forwards a chat event to the sink.
    ///
    /// Only a closed sink is an error; ignored and malformed frames are
    /// recorded and absorbed.
    pub async fn dispatch(&self, packet: OuterPacket) -> Result<()> {
        let started = Instant::now();
        let classified = Self::classify(&packet);
        self.metrics.dispatch_duration.observe(&[], started.elapsed());

        match classified {
            Classification::Chat(event) => {
                tracing::debug!(sender = %event.sender_name, "chat event");
                self.sink.emit(event).await?;
                self.metrics.events_emitted.inc(&[]);
            }
            Classification::Ignored(reason) => {
                tracing::debug!(?reason, "frame ignored");
                self.metrics.frames_ignored.inc(&[("reason", reason.as_str())]);
            }
            Classification::Malformed(LayerError { layer, error }) => {
                self.record_decode_failure(layer, &error);
            }
        }
        Ok(())
    }

    pub fn record_decode_failure(&self, layer: Layer, error: &DecodeError) {
        tracing::warn!(layer = layer.as_str(), code = error.code(), %error, "dropping malformed frame");
        self.metrics.decode_errors.inc(&[("layer", layer.as_str())]);
    }
}
