//! Decode-once codec for inbound websocket messages.
//!
//! - Binary messages => `OuterPacket`
//! - Close => `Inbound::Close`
//! - Everything else is a control message with no payload of interest

use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message;

use huyalive_core::error::DecodeError;
use huyalive_core::protocol::messages::OuterPacket;
use huyalive_core::protocol::tars::TarsMessage;

#[derive(Debug)]
pub enum Inbound {
    Packet(OuterPacket),
    Control,
    Close(Option<String>),
}

/// Metrics label of a message.
pub fn kind(msg: &Message) -> &'static str {
    match msg {
        Message::Binary(_) => "binary",
        Message::Text(_) => "text",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

pub fn decode(msg: Message) -> Result<Inbound, DecodeError> {
    match msg {
        Message::Binary(b) => OuterPacket::decode(Bytes::from(b)).map(Inbound::Packet),
        Message::Close(frame) => Ok(Inbound::Close(
            frame.map(|f| format!("{} {}", u16::from(f.code), f.reason)),
        )),
        Message::Text(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
            Ok(Inbound::Control)
        }
    }
}
