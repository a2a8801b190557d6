//! Push-message dispatch.
//!
//! Re-exports the dispatcher, the event type and the sink trait so callers can
//! depend on this module directly.

pub mod dispatcher;

pub use dispatcher::{
    ChatEvent, Classification, Dispatcher, EventSink, FnSink, IgnoreReason, Layer, LayerError,
};
