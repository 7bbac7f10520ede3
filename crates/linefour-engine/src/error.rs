//! Error types for the engine layer.

/// Why the engine refused a move.
///
/// The `Display` text is what the offending client sees in its `error`
/// event, so it is written for players rather than for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMove {
    /// The same player tried to move twice in a row.
    #[error("It isn't your turn.")]
    NotYourTurn,

    /// The column has no free row left.
    #[error("This slot is full.")]
    ColumnFull,

    /// The column index is outside the board.
    #[error("Column must be between 0 and {max}.")]
    ColumnOutOfRange { max: usize },

    /// Someone already won; the board is frozen.
    #[error("The game is over.")]
    GameOver,
}
