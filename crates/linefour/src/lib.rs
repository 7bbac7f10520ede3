//! # Linefour
//!
//! A real-time relay for two-player Connect Four over WebSockets.
//!
//! One connection creates a game and receives two capability tokens: a
//! *join* token that seats a second player, and a *watch* token that
//! attaches spectators. Every accepted move is broadcast to all attached
//! connections, and late arrivals get the full move history replayed
//! before any live move. The game lives exactly as long as the connection
//! that created it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use linefour::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = RelayServerBuilder::new()
//!     .bind("0.0.0.0:8001")
//!     .build::<ConnectFour>()
//!     .await?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::RelayConfig;
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder, ServerHandle};

/// The types most applications need.
pub mod prelude {
    pub use crate::{RelayConfig, RelayError, RelayServer, RelayServerBuilder, ServerHandle};
    pub use linefour_engine::{ConnectFour, GameEngine, InvalidMove, Move};
    pub use linefour_protocol::{ClientMessage, Player, ServerEvent};
    pub use linefour_session::{MIN_TOKEN_BYTES, SessionConfig};
}
