//! Error types for the protocol layer.
//!
//! Each crate in linefour defines its own error enum, so a
//! `ProtocolError` always means the problem is in turning records into
//! bytes or back, never in networking or game state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, an
    /// unknown `type` tag, or a value of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The record decoded but breaks a protocol rule, e.g. an opening
    /// record that is not `init`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
