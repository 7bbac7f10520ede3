//! Relay configuration.

use std::time::Duration;

use linefour_session::SessionConfig;

/// Settings for a relay server.
///
/// Build one with [`RelayConfig::default()`] and override the fields you
/// care about, or go through
/// [`RelayServerBuilder`](crate::RelayServerBuilder).
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// Default: `127.0.0.1:8001`.
    pub bind_addr: String,

    /// How long a new connection may take to send its opening `init`
    /// record before it is dropped.
    ///
    /// Default: 5 seconds.
    pub handshake_timeout: Duration,

    /// Session and token settings.
    pub session: SessionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8001".to_string(),
            handshake_timeout: Duration::from_secs(5),
            session: SessionConfig::default(),
        }
    }
}
