//! Core protocol types for linefour's wire format.
//!
//! Every record on the wire is a JSON object with a `type` field that
//! says which kind of record it is. Inbound records (client → server) and
//! outbound records (server → client) are two separate closed enums, so a
//! `match` on either one is checked for exhaustiveness by the compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// The message sent to a join or watch attempt whose token resolves to no
/// live game.
pub const GAME_NOT_FOUND: &str = "game not found";

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One of the two seats at the board.
///
/// `One` is the connection that created the game and always moves first;
/// `Two` is the connection that joined with the join token.
///
/// On the wire a player is a bare integer, `1` or `2`. The
/// `#[serde(into = "u8", try_from = "u8")]` attribute routes serde through
/// the `u8` conversions below, so `Player::Two` becomes `2` in JSON and a
/// `3` is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// The opponent.
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> Self {
        match player {
            Player::One => 1,
            Player::Two => 2,
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown player {other}"
            ))),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", u8::from(*self))
    }
}

// ---------------------------------------------------------------------------
// ClientMessage — inbound records
// ---------------------------------------------------------------------------

/// Records a client sends to the server.
///
/// `#[serde(tag = "type", rename_all = "lowercase")]` gives the
/// internally tagged shape the browser client speaks:
///   `{ "type": "init", "join": "3f0c…" }`
///   `{ "type": "play", "column": 3 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// First record on every connection: start a game, or attach to one
    /// with a join or watch token.
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        watch: Option<String>,
    },

    /// A move request: drop a piece into `column`.
    Play { column: usize },
}

/// What a connection asked for in its opening `init` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Start a new game as player one.
    Start,
    /// Join an existing game as player two.
    Join(String),
    /// Watch an existing game as a spectator.
    Watch(String),
}

impl TryFrom<ClientMessage> for Intent {
    type Error = ProtocolError;

    /// Interprets the opening record. Anything other than an `init` that
    /// carries at most one of `join` / `watch` is a protocol violation.
    fn try_from(msg: ClientMessage) -> Result<Self, Self::Error> {
        match msg {
            ClientMessage::Init { join: None, watch: None } => Ok(Self::Start),
            ClientMessage::Init { join: Some(token), watch: None } => {
                Ok(Self::Join(token))
            }
            ClientMessage::Init { join: None, watch: Some(token) } => {
                Ok(Self::Watch(token))
            }
            ClientMessage::Init { .. } => Err(ProtocolError::InvalidMessage(
                "init carries both join and watch".into(),
            )),
            ClientMessage::Play { .. } => Err(ProtocolError::InvalidMessage(
                "first message must be init".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent — outbound records
// ---------------------------------------------------------------------------

/// Records the server sends to clients.
///
/// One variant per event kind:
///
/// | type    | sent to          | meaning                              |
/// |---------|------------------|--------------------------------------|
/// | `init`  | the creator      | game created; tokens for invite links |
/// | `play`  | every connection | a move was applied                   |
/// | `win`   | every connection | the named player just won            |
/// | `error` | one connection   | a recoverable failure                |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// The game exists. `join` goes in the second player's invite link,
    /// `watch` in spectator links.
    Init { join: String, watch: String },

    /// `player` dropped a piece into `column`; it landed in `row`.
    Play {
        player: Player,
        column: usize,
        row: usize,
    },

    /// `player` has four in a row.
    Win { player: Player },

    /// Something this connection sent could not be honoured.
    Error { message: String },
}

impl ServerEvent {
    /// Builds an `error` event from anything printable.
    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    /// The wire tag of this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Play { .. } => "play",
            Self::Win { .. } => "win",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
