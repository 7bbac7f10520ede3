//! Board-game rules for linefour.
//!
//! The relay treats the rules as an opaque collaborator: it only ever
//! attempts a move, asks whether that move won, and reads back the move
//! history for replay. Those three queries form the [`GameEngine`] trait.
//!
//! # Key types
//!
//! - [`GameEngine`] — the trait a rule set implements
//! - [`ConnectFour`] — the seven-by-six, four-in-a-row rules
//! - [`Move`] — one accepted move, as recorded for replay
//! - [`InvalidMove`] — why a move was rejected

mod connect_four;
mod engine;
mod error;

pub use connect_four::{COLUMNS, ConnectFour, ROWS};
pub use engine::{GameEngine, Move};
pub use error::InvalidMove;
