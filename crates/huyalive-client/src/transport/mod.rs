//! Transport layer (chat websocket).
//!
//! Exposes the session that owns the socket and the codec that decodes each
//! inbound message once before it reaches the dispatcher.

pub mod codec;
pub mod session;
