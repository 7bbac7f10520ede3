//! Error types for the session layer.

use linefour_engine::InvalidMove;
use linefour_protocol::{GAME_NOT_FOUND, ProtocolError};

/// Errors that can occur while looking up or playing in a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session is registered under the given token. Either the
    /// token was never issued or its game's creator has left.
    #[error("{}", GAME_NOT_FOUND)]
    NotFound,

    /// The session configuration would issue guessable tokens.
    #[error("capability tokens need at least {min} bytes, got {bytes}")]
    WeakTokens { bytes: usize, min: usize },

    /// The engine rejected the move. The board is unchanged.
    #[error(transparent)]
    InvalidMove(#[from] InvalidMove),

    /// An event could not be encoded for delivery.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
