//! Protocol modules (TARS codec + Huya chat messages).
//!
//! - `tars`: schema-driven tag/length/value struct codec.
//! - `messages`: the static schemas and typed structs used by the chat socket.
//!
//! All parsers are panic-free: malformed input is reported as `DecodeError`
//! instead of panicking or indexing raw buffers, so one bad push frame costs
//! one dropped message and nothing more.

pub mod messages;
pub mod tars;
