//! huyalive client library entry.
//!
//! Wires the chat socket session, the push-message dispatcher, config loading
//! and in-process metrics on top of `huyalive-core`. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod config;
pub mod dispatch;
pub mod obs;
pub mod transport;

pub use dispatch::{ChatEvent, Dispatcher, EventSink, FnSink};
pub use obs::metrics::ClientMetrics;
pub use transport::session::{Session, SessionConfig, SessionState, DEFAULT_ENDPOINT};
