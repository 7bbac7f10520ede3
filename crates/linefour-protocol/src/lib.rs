//! Wire protocol for linefour.
//!
//! This crate defines the records that clients and the relay exchange:
//!
//! - **Types** ([`ClientMessage`], [`ServerEvent`], [`Player`], [`Intent`])
//!   — the closed set of records that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those records are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the session
//! layer. It knows nothing about connections or games in progress; it only
//! knows how to serialize and deserialize records.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage / ServerEvent) → Session
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, GAME_NOT_FOUND, Intent, Player, ServerEvent};
