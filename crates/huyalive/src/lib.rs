//! Top-level facade crate for huyalive.
//!
//! Re-exports the codec/signing core and the chat client so users can depend
//! on a single crate.

pub mod core {
    pub use huyalive_core::*;
}

pub mod client {
    pub use huyalive_client::*;
}
