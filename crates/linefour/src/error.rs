//! Unified error type for the relay.

use linefour_protocol::ProtocolError;
use linefour_session::SessionError;
use linefour_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically inside the handler.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown token, rejected move).
    #[error(transparent)]
    Session(#[from] SessionError),
}
