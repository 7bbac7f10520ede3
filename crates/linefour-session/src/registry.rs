//! The session registry: maps capability tokens to live sessions.
//!
//! This is the process-wide index of games in progress. It is
//! responsible for:
//! - Creating a session and issuing its join and watch tokens
//! - Resolving a token back to its session
//! - Tearing a session down so neither token resolves any more
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself — it holds two plain
//! `HashMap`s. The server owns exactly one registry behind a mutex, and
//! every method here is a synchronous map operation, so the lock is never
//! held across I/O. Inserting or removing both tokens inside one `&mut
//! self` call is what makes creation and teardown atomic for lookups.

use std::collections::HashMap;
use std::sync::Arc;

use linefour_engine::GameEngine;

use crate::token::generate_token;
use crate::{Session, SessionConfig, SessionError};

/// Tracks every live session under both of its tokens.
///
/// ## Lifecycle
///
/// ```text
/// create_session() ──→ lookup_by_join_token() / lookup_by_watch_token()
///        │                         │
///        ▼                         ▼
///   [both tokens live]        Arc<Session>
///        │
///        ▼
/// destroy_session() ──→ [neither token resolves, ever again]
/// ```
pub struct SessionRegistry<G: GameEngine> {
    /// join token → session.
    join: HashMap<String, Arc<Session<G>>>,

    /// watch token → session. Always holds the same sessions as `join`.
    watch: HashMap<String, Arc<Session<G>>>,

    config: SessionConfig,
}

impl<G: GameEngine> SessionRegistry<G> {
    /// Creates an empty registry.
    ///
    /// # Errors
    /// [`SessionError::WeakTokens`] if `config` asks for tokens shorter
    /// than [`MIN_TOKEN_BYTES`](crate::MIN_TOKEN_BYTES). Short tokens
    /// collide, and a colliding insert would hand one session's token to
    /// another.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            join: HashMap::new(),
            watch: HashMap::new(),
            config,
        })
    }

    /// Starts a new game and registers it under two fresh tokens.
    ///
    /// Returns the session together with its join and watch tokens. The
    /// session's connection set starts empty; the caller attaches the
    /// creating connection.
    pub fn create_session(&mut self) -> (Arc<Session<G>>, String, String) {
        let join_token = generate_token(self.config.token_bytes);
        let watch_token = generate_token(self.config.token_bytes);

        let session = Arc::new(Session::new(
            join_token.clone(),
            watch_token.clone(),
        ));

        self.join.insert(join_token.clone(), Arc::clone(&session));
        self.watch.insert(watch_token.clone(), Arc::clone(&session));

        tracing::info!(session = %session.id(), live = self.len(), "session created");

        (session, join_token, watch_token)
    }

    /// Resolves a join token.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no live session was issued this token.
    pub fn lookup_by_join_token(
        &self,
        token: &str,
    ) -> Result<Arc<Session<G>>, SessionError> {
        self.join.get(token).cloned().ok_or(SessionError::NotFound)
    }

    /// Resolves a watch token.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no live session was issued this token.
    pub fn lookup_by_watch_token(
        &self,
        token: &str,
    ) -> Result<Arc<Session<G>>, SessionError> {
        self.watch.get(token).cloned().ok_or(SessionError::NotFound)
    }

    /// Removes both of the session's tokens.
    ///
    /// Idempotent: destroying a session that is already gone does
    /// nothing. Only entries that still point at *this* session are
    /// removed. Returns `true` if anything was removed.
    pub fn destroy_session(&mut self, session: &Session<G>) -> bool {
        let removed_join =
            remove_if_same(&mut self.join, session.join_token(), session);
        let removed_watch =
            remove_if_same(&mut self.watch, session.watch_token(), session);

        let removed = removed_join || removed_watch;
        if removed {
            tracing::info!(session = %session.id(), live = self.len(), "session destroyed");
        }
        removed
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.join.len()
    }

    /// Returns `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.join.is_empty()
    }
}

impl<G: GameEngine> Default for SessionRegistry<G> {
    fn default() -> Self {
        Self {
            join: HashMap::new(),
            watch: HashMap::new(),
            config: SessionConfig::default(),
        }
    }
}

fn remove_if_same<G: GameEngine>(
    map: &mut HashMap<String, Arc<Session<G>>>,
    token: &str,
    session: &Session<G>,
) -> bool {
    match map.get(token) {
        Some(entry) if std::ptr::eq(Arc::as_ptr(entry), session) => {
            map.remove(token);
            true
        }
        _ => false,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`, named
    //! `test_{function}_{scenario}_{expected}`.

    use linefour_engine::ConnectFour;

    use super::*;

    fn registry() -> SessionRegistry<ConnectFour> {
        SessionRegistry::default()
    }

    // =====================================================================
    // create_session()
    // =====================================================================

    #[test]
    fn test_create_session_registers_both_tokens() {
        let mut reg = registry();

        let (session, join, watch) = reg.create_session();

        assert_eq!(session.join_token(), join);
        assert_eq!(session.watch_token(), watch);
        assert_eq!(join.len(), 32);
        assert_ne!(join, watch, "join and watch tokens must differ");
        assert!(Arc::ptr_eq(&reg.lookup_by_join_token(&join).unwrap(), &session));
        assert!(Arc::ptr_eq(&reg.lookup_by_watch_token(&watch).unwrap(), &session));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_create_session_starts_with_no_connections() {
        let mut reg = registry();

        let (session, _, _) = reg.create_session();

        assert_eq!(session.connection_count(), 0);
        assert!(session.moves().is_empty());
    }

    #[test]
    fn test_create_session_twice_gives_independent_sessions() {
        let mut reg = registry();

        let (a, join_a, watch_a) = reg.create_session();
        let (b, join_b, watch_b) = reg.create_session();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(join_a, join_b);
        assert_ne!(watch_a, watch_b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_create_session_respects_token_bytes() {
        let mut reg: SessionRegistry<ConnectFour> =
            SessionRegistry::new(SessionConfig { token_bytes: 24 }).unwrap();

        let (_, join, watch) = reg.create_session();

        assert_eq!(join.len(), 48);
        assert_eq!(watch.len(), 48);
    }

    // =====================================================================
    // new()
    // =====================================================================

    #[test]
    fn test_new_with_empty_tokens_is_rejected() {
        let result: Result<SessionRegistry<ConnectFour>, _> =
            SessionRegistry::new(SessionConfig { token_bytes: 0 });

        assert!(matches!(
            result,
            Err(SessionError::WeakTokens { bytes: 0, min: 16 })
        ));
    }

    #[test]
    fn test_new_with_one_byte_tokens_is_rejected() {
        let result: Result<SessionRegistry<ConnectFour>, _> =
            SessionRegistry::new(SessionConfig { token_bytes: 1 });

        assert!(result.is_err());
    }

    #[test]
    fn test_new_with_minimum_keeps_sessions_apart() {
        let mut reg: SessionRegistry<ConnectFour> =
            SessionRegistry::new(SessionConfig { token_bytes: 16 }).unwrap();

        let (a, join_a, watch_a) = reg.create_session();
        let (_, join_b, _) = reg.create_session();

        assert_ne!(join_a, watch_a);
        assert_ne!(join_a, join_b);
        assert!(reg.lookup_by_watch_token(&join_a).is_err());
        assert!(Arc::ptr_eq(&reg.lookup_by_join_token(&join_a).unwrap(), &a));
        assert_eq!(reg.len(), 2);
    }

    // =====================================================================
    // lookup_by_*_token()
    // =====================================================================

    #[test]
    fn test_lookup_unknown_token_returns_not_found() {
        let mut reg = registry();
        reg.create_session();

        assert!(matches!(
            reg.lookup_by_join_token("garbage"),
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            reg.lookup_by_watch_token("garbage"),
            Err(SessionError::NotFound)
        ));
    }

    #[test]
    fn test_lookup_tokens_are_single_purpose() {
        let mut reg = registry();
        let (_, join, watch) = reg.create_session();

        assert!(reg.lookup_by_watch_token(&join).is_err(), "join token must not watch");
        assert!(reg.lookup_by_join_token(&watch).is_err(), "watch token must not join");
    }

    #[test]
    fn test_not_found_displays_game_not_found() {
        assert_eq!(SessionError::NotFound.to_string(), "game not found");
    }

    // =====================================================================
    // destroy_session()
    // =====================================================================

    #[test]
    fn test_destroy_session_invalidates_both_tokens() {
        let mut reg = registry();
        let (session, join, watch) = reg.create_session();

        assert!(reg.destroy_session(&session));

        assert!(reg.lookup_by_join_token(&join).is_err());
        assert!(reg.lookup_by_watch_token(&watch).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_destroy_session_twice_is_a_no_op() {
        let mut reg = registry();
        let (session, _, _) = reg.create_session();
        reg.destroy_session(&session);

        assert!(!reg.destroy_session(&session));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_destroy_session_leaves_other_sessions_alone() {
        let mut reg = registry();
        let (a, _, _) = reg.create_session();
        let (_, join_b, watch_b) = reg.create_session();

        reg.destroy_session(&a);

        assert_eq!(reg.len(), 1);
        assert!(reg.lookup_by_join_token(&join_b).is_ok());
        assert!(reg.lookup_by_watch_token(&watch_b).is_ok());
    }

    #[test]
    fn test_destroy_session_with_attached_connections_still_destroys() {
        use crate::Peer;
        use linefour_transport::ConnectionId;

        let mut reg = registry();
        let (session, join, _) = reg.create_session();
        let (spectator, _rx) = Peer::channel(ConnectionId::new(7));
        session.attach(spectator);

        reg.destroy_session(&session);

        assert!(reg.lookup_by_join_token(&join).is_err());
        assert_eq!(session.connection_count(), 1, "connections are not touched");
    }

    #[test]
    fn test_len_tracks_session_count() {
        let mut reg = registry();
        assert!(reg.is_empty());

        let (a, _, _) = reg.create_session();
        reg.create_session();
        assert_eq!(reg.len(), 2);

        reg.destroy_session(&a);
        assert_eq!(reg.len(), 1);
    }
}
