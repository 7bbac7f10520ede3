//! The `GameEngine` trait — the seam between the relay and the rules.

use linefour_protocol::Player;

use crate::InvalidMove;

/// One accepted move: who played, where, and the row the piece landed in.
///
/// The engine records these in the order it accepts them; replaying the
/// sequence to a late joiner rebuilds the board on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub player: Player,
    pub column: usize,
    pub row: usize,
}

/// The rules of a two-player, column-drop board game.
///
/// A session owns exactly one engine and is the only thing that mutates
/// it. `Default` builds the empty starting board.
///
/// # Trait bounds
///
/// - `Default` → the registry can build a fresh game per session.
/// - `Send + 'static` → the engine lives behind a per-session lock that
///   connection tasks on any Tokio worker thread may take.
pub trait GameEngine: Default + Send + 'static {
    /// Drops a piece for `player` into `column`.
    ///
    /// Returns the row the piece landed in. A rejected move leaves the
    /// board untouched.
    fn attempt_move(
        &mut self,
        player: Player,
        column: usize,
    ) -> Result<usize, InvalidMove>;

    /// Returns `true` if the most recent accepted move won the game.
    fn last_move_won(&self) -> bool;

    /// Every accepted move, oldest first.
    fn moves(&self) -> &[Move];
}
