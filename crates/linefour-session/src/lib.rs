//! Game sessions for linefour.
//!
//! This crate holds the state that connection handlers share:
//!
//! 1. **Capability tokens** — unguessable strings that grant join or
//!    watch access to one game
//! 2. **Sessions** ([`Session`]) — one engine, its attached connections,
//!    and its two tokens
//! 3. **The registry** ([`SessionRegistry`]) — token → session lookup,
//!    with atomic creation and teardown
//! 4. **Broadcast** ([`Peer`], [`broadcast`]) — per-connection outbound
//!    queues and fan-out
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection handler (above)  ← drives start / join / watch flows
//!     ↕
//! Session layer (this crate)  ← shared game state and membership
//!     ↕
//! Engine + Protocol (below)   ← rules, Player, ServerEvent, Codec
//! ```

mod broadcast;
mod error;
mod registry;
mod session;
mod token;

pub use broadcast::{Payload, Peer, PeerReceiver, broadcast};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{
    MIN_TOKEN_BYTES, MoveOutcome, Session, SessionConfig, SessionId, play_event,
};
pub use token::generate_token;
