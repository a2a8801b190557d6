//! Shared error types across huyalive crates.

use thiserror::Error;

use crate::protocol::tars::WireType;

/// Stable error codes (used in logs and test vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Transport failed or was closed by the remote.
    Connection,
    /// Malformed inbound frame.
    Decode,
    /// Value could not be encoded against its schema.
    Encode,
    /// Operation not valid in the current session state.
    InvalidState,
    /// Configuration rejected.
    BadConfig,
    /// The caller's event sink went away.
    SinkClosed,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Connection => "CONNECTION",
            ErrorCode::Decode => "DECODE",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::SinkClosed => "SINK_CLOSED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HuyaLiveError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum HuyaLiveError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("invalid session state: {0}")]
    InvalidState(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("event sink closed")]
    SinkClosed,
    #[error("internal: {0}")]
    Internal(String),
}

impl HuyaLiveError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            HuyaLiveError::Connection(_) => ErrorCode::Connection,
            HuyaLiveError::Decode(_) => ErrorCode::Decode,
            HuyaLiveError::Encode(_) => ErrorCode::Encode,
            HuyaLiveError::InvalidState(_) => ErrorCode::InvalidState,
            HuyaLiveError::BadConfig(_) => ErrorCode::BadConfig,
            HuyaLiveError::SinkClosed => ErrorCode::SinkClosed,
            HuyaLiveError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Failure to decode a TARS buffer. Aborts only the message being decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated buffer: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("length {len} exceeds remaining {remaining} bytes")]
    LengthOverflow { len: usize, remaining: usize },
    #[error("negative length {0}")]
    NegativeLength(i64),
    #[error("unknown wire type {0}")]
    UnknownWireType(u8),
    #[error("field `{field}` (tag {tag}) cannot be read from wire type {found:?}")]
    TypeMismatch {
        tag: u8,
        field: &'static str,
        found: WireType,
    },
    #[error("missing field `{field}` in {schema}")]
    MissingField {
        schema: &'static str,
        field: &'static str,
    },
    #[error("field `{field}` is not valid utf-8")]
    InvalidUtf8 { field: &'static str },
    #[error("struct end outside of a nested struct")]
    UnexpectedStructEnd,
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}

impl DecodeError {
    /// Stable upper-case code for vectors and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::Truncated { .. } => "TRUNCATED",
            DecodeError::LengthOverflow { .. } => "LENGTH_OVERFLOW",
            DecodeError::NegativeLength(_) => "NEGATIVE_LENGTH",
            DecodeError::UnknownWireType(_) => "UNKNOWN_WIRE_TYPE",
            DecodeError::TypeMismatch { .. } => "TYPE_MISMATCH",
            DecodeError::MissingField { .. } => "MISSING_FIELD",
            DecodeError::InvalidUtf8 { .. } => "INVALID_UTF8",
            DecodeError::UnexpectedStructEnd => "UNEXPECTED_STRUCT_END",
            DecodeError::TooDeep(_) => "TOO_DEEP",
        }
    }
}

/// Failure to encode a value against its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("missing field `{field}` in {schema}")]
    MissingField {
        schema: &'static str,
        field: &'static str,
    },
    #[error("field `{field}` holds a value of the wrong type")]
    TypeMismatch { field: &'static str },
    #[error("field `{field}` value {value} out of range")]
    IntOutOfRange { field: &'static str, value: i64 },
    #[error("field `{field}` is too long ({len} bytes)")]
    TooLong { field: &'static str, len: usize },
}
