//! huyalive core: transport-agnostic protocol primitives, error types, and
//! anti-leech URL signing.
//!
//! This crate defines the wire-level contracts shared by the chat client and
//! any tooling built around it. It carries no socket or runtime dependencies so
//! the codec and the signer can be reused outside of tokio.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed frames surface as `DecodeError` so a hostile or corrupted push
//! never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod anticode;
pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{DecodeError, EncodeError, HuyaLiveError, Result};
