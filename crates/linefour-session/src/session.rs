//! Session types: one game in progress and everything attached to it.
//!
//! A session owns:
//! - the game engine (exclusively; nothing outside the session touches it)
//! - the ordered set of connections currently attached
//! - the two capability tokens that resolve to it in the registry
//!
//! # Locking
//!
//! Two locks, always taken in the order `game` → `connections`:
//!
//! - `game` makes "apply move, then broadcast its events" one critical
//!   section, so every peer sees moves in the order the engine accepted
//!   them. Attaching with replay takes the same lock, so no live move can
//!   reach a newcomer ahead of its replay.
//! - `connections` guards membership only.
//!
//! Both are `std::sync::Mutex`: every critical section is synchronous
//! (engine call plus non-blocking enqueues), and a std guard cannot be
//! carried across an `.await` in a spawned task.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use linefour_engine::{GameEngine, Move};
use linefour_protocol::{Codec, Player, ServerEvent};
use linefour_transport::ConnectionId;

use crate::broadcast::{Peer, broadcast};
use crate::SessionError;

/// Counter for generating session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Fewest bytes of entropy a capability token may carry (128 bits).
///
/// Token collisions are never checked for, so this floor is what keeps
/// every session under exactly its own two tokens.
pub const MIN_TOKEN_BYTES: usize = 16;

/// Configuration for session creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bytes of entropy per capability token. The token string is twice
    /// this many hex characters. Must be at least [`MIN_TOKEN_BYTES`].
    ///
    /// Default: 16 (128 bits).
    pub token_bytes: usize,
}

impl SessionConfig {
    /// Checks the settings before any token is issued.
    ///
    /// # Errors
    /// [`SessionError::WeakTokens`] if `token_bytes` is below
    /// [`MIN_TOKEN_BYTES`].
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(SessionError::WeakTokens {
                bytes: self.token_bytes,
                min: MIN_TOKEN_BYTES,
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_bytes: MIN_TOKEN_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A process-local label for a session, used in logs instead of the
/// tokens (which are secrets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One game in progress.
///
/// Shared as `Arc<Session<G>>` between the registry and every connection
/// handler attached to it.
pub struct Session<G: GameEngine> {
    id: SessionId,
    join_token: String,
    watch_token: String,
    game: Mutex<G>,
    connections: Mutex<Vec<Peer>>,
}

/// The result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The move as the engine recorded it.
    pub played: Move,
    /// Whether this move won the game.
    pub won: bool,
}

impl<G: GameEngine> Session<G> {
    pub(crate) fn new(join_token: String, watch_token: String) -> Self {
        Self {
            id: SessionId::next(),
            join_token,
            watch_token,
            game: Mutex::new(G::default()),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// The session's log label.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The token that lets a second player join.
    pub fn join_token(&self) -> &str {
        &self.join_token
    }

    /// The token that lets spectators watch.
    pub fn watch_token(&self) -> &str {
        &self.watch_token
    }

    /// Adds a connection to the set without replaying anything. Used for
    /// the creator, who attaches before any move exists.
    pub fn attach(&self, peer: Peer) {
        let mut connections = lock(&self.connections);
        tracing::debug!(session = %self.id, conn_id = %peer.id(), "connection attached");
        connections.push(peer);
    }

    /// Queues the full move history to `peer`, then adds it to the set.
    ///
    /// Both happen under the game lock, so the replay is complete and in
    /// order before any live broadcast can reach the peer. Returns the
    /// number of moves replayed.
    pub fn attach_with_replay(
        &self,
        peer: Peer,
        codec: &impl Codec,
    ) -> Result<usize, SessionError> {
        let game = lock(&self.game);
        let history = game.moves();
        for played in history {
            peer.send(&play_event(played), codec)?;
        }
        let replayed = history.len();
        lock(&self.connections).push(peer.clone());
        drop(game);

        tracing::debug!(
            session = %self.id,
            conn_id = %peer.id(),
            replayed,
            "connection attached with replay"
        );
        Ok(replayed)
    }

    /// Removes a connection from the set. Returns `false` if it was not
    /// attached.
    pub fn detach(&self, conn_id: ConnectionId) -> bool {
        let mut connections = lock(&self.connections);
        let before = connections.len();
        connections.retain(|peer| peer.id() != conn_id);
        let removed = connections.len() != before;
        if removed {
            tracing::debug!(session = %self.id, %conn_id, "connection detached");
        }
        removed
    }

    /// Attempts a move and, if the engine accepts it, broadcasts `play`
    /// (and `win` when it decides the game) to every attached connection.
    ///
    /// # Errors
    /// - [`SessionError::InvalidMove`] — the engine refused; nothing was
    ///   broadcast and the board is unchanged.
    /// - [`SessionError::Protocol`] — an event failed to encode.
    pub fn play(
        &self,
        player: Player,
        column: usize,
        codec: &impl Codec,
    ) -> Result<MoveOutcome, SessionError> {
        let mut game = lock(&self.game);
        let row = game.attempt_move(player, column)?;
        let won = game.last_move_won();
        let played = Move { player, column, row };

        let peers = self.connections();
        broadcast(&peers, &play_event(&played), codec)?;
        if won {
            broadcast(&peers, &ServerEvent::Win { player }, codec)?;
            tracing::info!(session = %self.id, %player, "game won");
        }
        drop(game);

        Ok(MoveOutcome { played, won })
    }

    /// A snapshot of the attached connections, in attachment order.
    pub fn connections(&self) -> Vec<Peer> {
        lock(&self.connections).clone()
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        lock(&self.connections).len()
    }

    /// A copy of the move history, oldest first.
    pub fn moves(&self) -> Vec<Move> {
        lock(&self.game).moves().to_vec()
    }
}

impl<G: GameEngine> fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

/// The `play` event for a recorded move.
pub fn play_event(played: &Move) -> ServerEvent {
    ServerEvent::Play {
        player: played.player,
        column: played.column,
        row: played.row,
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked.
/// Every critical section here leaves the data consistent before any
/// point that could panic, so the poison flag carries no information.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
