//! Per-connection handler: opening `init`, role dispatch, and the read loops.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Start a writer task that drains this connection's outbound queue
//!   2. Receive the opening `init` → decide the role
//!   3. Creator: new session, send `init` with tokens, read moves as player one
//!      Joiner:  resolve join token, replay history, read moves as player two
//!      Watcher: resolve watch token, replay history, ignore input
//!   4. On close: detach; if this was the creator, destroy the session
//!
//! Nothing is ever written to the socket directly from here. Every record
//! for this connection (its own errors included) goes through its queue,
//! so the wire order is the enqueue order.

use std::sync::Arc;

use linefour_engine::GameEngine;
use linefour_protocol::{
    ClientMessage, Codec, Intent, Player, ProtocolError, ServerEvent,
};
use linefour_session::{Peer, PeerReceiver, Session, SessionError};
use linefour_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::server::ServerState;
use crate::RelayError;

/// Drop guard that removes a connection from its session when the
/// handler exits, and tears the whole session down if the connection
/// created it.
///
/// Runs on every exit path: clean close, transport error, or panic.
struct AttachmentGuard<G: GameEngine, C: Codec> {
    session: Arc<Session<G>>,
    conn_id: ConnectionId,
    /// Set only for the creator.
    owner: Option<Arc<ServerState<G, C>>>,
}

impl<G: GameEngine, C: Codec> Drop for AttachmentGuard<G, C> {
    fn drop(&mut self) {
        self.session.detach(self.conn_id);
        if let Some(state) = &self.owner {
            state.registry().destroy_session(&self.session);
        }
    }
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<G, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<G, C>>,
) -> Result<(), RelayError>
where
    G: GameEngine,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (peer, rx) = Peer::channel(conn_id);
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx));

    let result = serve(&conn, &peer, &state).await;

    // Once the session has dropped its clone too, the queue closes: the
    // writer flushes what is left (a final `error`, say) and closes the
    // socket.
    drop(peer);
    if let Err(e) = writer.await {
        tracing::debug!(%conn_id, error = %e, "writer task failed");
    }

    result
}

/// Reads the opening record and runs the matching role.
async fn serve<G, C>(
    conn: &WebSocketConnection,
    peer: &Peer,
    state: &Arc<ServerState<G, C>>,
) -> Result<(), RelayError>
where
    G: GameEngine,
    C: Codec,
{
    let Some(intent) = read_intent(conn, peer, state).await? else {
        return Ok(());
    };

    match intent {
        Intent::Start => start(conn, peer, state).await,
        Intent::Join(token) => {
            let found = state.registry().lookup_by_join_token(&token);
            match found {
                Ok(session) => join(conn, peer, state, session).await,
                Err(e) => reject(conn.id(), peer, state, e),
            }
        }
        Intent::Watch(token) => {
            let found = state.registry().lookup_by_watch_token(&token);
            match found {
                Ok(session) => watch(conn, peer, state, session).await,
                Err(e) => reject(conn.id(), peer, state, e),
            }
        }
    }
}

/// Waits for the opening `init`.
///
/// Returns `None` when the connection should simply end: it closed, timed
/// out, or sent something other than a well-formed `init` (in which case
/// an `error` is queued first).
async fn read_intent<G, C>(
    conn: &WebSocketConnection,
    peer: &Peer,
    state: &ServerState<G, C>,
) -> Result<Option<Intent>, RelayError>
where
    G: GameEngine,
    C: Codec,
{
    let conn_id = conn.id();

    let data = match tokio::time::timeout(
        state.config.handshake_timeout,
        conn.recv(),
    )
    .await
    {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            tracing::debug!(%conn_id, "closed before init");
            return Ok(None);
        }
        Ok(Err(e)) => {
            tracing::debug!(%conn_id, error = %e, "recv error before init");
            return Ok(None);
        }
        Err(_) => {
            tracing::info!(%conn_id, "no init within handshake timeout");
            return Ok(None);
        }
    };

    let intent = state
        .codec
        .decode::<ClientMessage>(&data)
        .and_then(Intent::try_from);

    match intent {
        Ok(intent) => Ok(Some(intent)),
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "bad opening message");
            peer.send(&ServerEvent::error("expected init"), &state.codec)?;
            Ok(None)
        }
    }
}

/// Creator: open a session, hand out its tokens, play as player one.
async fn start<G, C>(
    conn: &WebSocketConnection,
    peer: &Peer,
    state: &Arc<ServerState<G, C>>,
) -> Result<(), RelayError>
where
    G: GameEngine,
    C: Codec,
{
    let (session, join, watch) = state.registry().create_session();
    session.attach(peer.clone());
    let _guard = AttachmentGuard {
        session: Arc::clone(&session),
        conn_id: conn.id(),
        owner: Some(Arc::clone(state)),
    };

    tracing::info!(conn_id = %conn.id(), session = %session.id(), "game started");
    peer.send(&ServerEvent::Init { join, watch }, &state.codec)?;

    play_loop(conn, peer, state, &session, Player::One).await
}

/// Second player: catch up on history, then play as player two.
async fn join<G, C>(
    conn: &WebSocketConnection,
    peer: &Peer,
    state: &ServerState<G, C>,
    session: Arc<Session<G>>,
) -> Result<(), RelayError>
where
    G: GameEngine,
    C: Codec,
{
    let _guard = AttachmentGuard::<G, C> {
        session: Arc::clone(&session),
        conn_id: conn.id(),
        owner: None,
    };
    let replayed = session.attach_with_replay(peer.clone(), &state.codec)?;
    tracing::info!(conn_id = %conn.id(), session = %session.id(), replayed, "player joined");

    play_loop(conn, peer, state, &session, Player::Two).await
}

/// Spectator: catch up on history, then receive broadcasts until close.
async fn watch<G, C>(
    conn: &WebSocketConnection,
    peer: &Peer,
    state: &ServerState<G, C>,
    session: Arc<Session<G>>,
) -> Result<(), RelayError>
where
    G: GameEngine,
    C: Codec,
{
    let conn_id = conn.id();
    let _guard = AttachmentGuard::<G, C> {
        session: Arc::clone(&session),
        conn_id,
        owner: None,
    };
    let replayed = session.attach_with_replay(peer.clone(), &state.codec)?;
    tracing::info!(%conn_id, session = %session.id(), replayed, "spectator attached");

    while let Some(_data) = next_message(conn, peer).await {
        peer.send(&ServerEvent::error("spectators cannot play"), &state.codec)?;
    }
    Ok(())
}

/// Queues the lookup failure for this connection. The connection then
/// ends, and the writer flushes the `error` before closing.
fn reject<G, C>(
    conn_id: ConnectionId,
    peer: &Peer,
    state: &ServerState<G, C>,
    err: SessionError,
) -> Result<(), RelayError>
where
    G: GameEngine,
    C: Codec,
{
    tracing::debug!(%conn_id, error = %err, "token did not resolve");
    peer.send(&ServerEvent::error(&err), &state.codec)?;
    Ok(())
}

/// Reads `play` records and applies them as `player` until the
/// connection closes.
///
/// A refused move or a malformed record earns an `error` for this
/// connection only; the loop keeps going either way.
async fn play_loop<G, C>(
    conn: &WebSocketConnection,
    peer: &Peer,
    state: &ServerState<G, C>,
    session: &Session<G>,
    player: Player,
) -> Result<(), RelayError>
where
    G: GameEngine,
    C: Codec,
{
    let conn_id = conn.id();

    while let Some(data) = next_message(conn, peer).await {
        let column = match state.codec.decode::<ClientMessage>(&data) {
            Ok(ClientMessage::Play { column }) => column,
            Ok(ClientMessage::Init { .. }) => {
                peer.send(
                    &ServerEvent::error("invalid message: expected play"),
                    &state.codec,
                )?;
                continue;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "undecodable message");
                peer.send(&invalid_message(&e), &state.codec)?;
                continue;
            }
        };

        match session.play(player, column, &state.codec) {
            Ok(outcome) => {
                tracing::debug!(
                    %conn_id,
                    session = %session.id(),
                    %player,
                    column,
                    row = outcome.played.row,
                    "move applied"
                );
            }
            Err(SessionError::InvalidMove(reason)) => {
                tracing::debug!(%conn_id, %player, column, %reason, "move refused");
                peer.send(&ServerEvent::error(&reason), &state.codec)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// The `error` reply for a record that failed to decode.
fn invalid_message(err: &ProtocolError) -> ServerEvent {
    match err {
        ProtocolError::Decode(inner) => {
            ServerEvent::error(format!("invalid message: {inner}"))
        }
        other => ServerEvent::error(other),
    }
}

/// Next inbound record, or `None` once the connection is done.
///
/// Nothing is read while this connection's own writer is backlogged, so a
/// client that sends without reading is held back by TCP instead of
/// growing its queue.
async fn next_message(
    conn: &WebSocketConnection,
    peer: &Peer,
) -> Option<Vec<u8>> {
    peer.wait_for_room().await;
    match conn.recv().await {
        Ok(Some(data)) => Some(data),
        Ok(None) => {
            tracing::debug!(conn_id = %conn.id(), "connection closed cleanly");
            None
        }
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "recv error");
            None
        }
    }
}

/// Drains the outbound queue onto the socket, then closes it.
///
/// Ends when every `Peer` for this connection is dropped, or on the first
/// failed send. After a failed send the receiver is gone, so later
/// broadcasts to this connection are skipped.
async fn write_loop(conn: Arc<WebSocketConnection>, mut rx: PeerReceiver) {
    let conn_id = conn.id();
    while let Some(payload) = rx.recv().await {
        if let Err(e) = conn.send(&payload).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}
