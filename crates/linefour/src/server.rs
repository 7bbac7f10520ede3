//! `RelayServer` builder and server loop.
//!
//! This is the composition root: it owns the one [`SessionRegistry`] and
//! hands every connection task a shared reference to it. Nothing in the
//! relay reaches the registry through a global.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use linefour_engine::GameEngine;
use linefour_protocol::{Codec, JsonCodec};
use linefour_session::{SessionConfig, SessionRegistry};
use linefour_transport::{Transport, Upgrade, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{RelayConfig, RelayError};

/// Shared server state passed to each connection handler task.
///
/// The registry sits behind a `std::sync::Mutex`: every registry call is
/// a synchronous map operation, and the connection guards need to tear a
/// session down from `Drop`.
pub(crate) struct ServerState<G: GameEngine, C: Codec> {
    registry: Mutex<SessionRegistry<G>>,
    pub(crate) codec: C,
    pub(crate) config: RelayConfig,
}

impl<G: GameEngine, C: Codec> ServerState<G, C> {
    /// Locks the registry, recovering the maps if a holder panicked.
    pub(crate) fn registry(&self) -> MutexGuard<'_, SessionRegistry<G>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// use linefour::prelude::*;
///
/// # async fn start() -> Result<(), RelayError> {
/// let server = RelayServerBuilder::new()
///     .bind("0.0.0.0:8001")
///     .build::<ConnectFour>()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a connection may stay silent before its `init`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Binds the listener and builds the server for engine `G`.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    ///
    /// # Errors
    /// Fails without binding if the session configuration is rejected
    /// (see [`SessionConfig::validate`]), or if the bind itself fails.
    pub async fn build<G: GameEngine>(
        self,
    ) -> Result<RelayServer<G, JsonCodec>, RelayError> {
        let registry = SessionRegistry::new(self.config.session.clone())?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(registry),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct RelayServer<G: GameEngine, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<G, C>>,
}

impl<G, C> RelayServer<G, C>
where
    G: GameEngine,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle for inspecting the running server.
    pub fn handle(&self) -> ServerHandle<G, C> {
        ServerHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// On shutdown the listener is released and no new connections are
    /// accepted. Connections already in flight keep running until their
    /// peers close them.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = ?self.local_addr().ok(), "relay running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        let peer_addr = pending.peer_addr();
                        tokio::spawn(async move {
                            let conn = match pending.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer_addr, error = %e, "upgrade failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        drop(self.transport);
        Ok(())
    }
}

/// A cheap, cloneable view of a running server's state.
pub struct ServerHandle<G: GameEngine, C: Codec> {
    state: Arc<ServerState<G, C>>,
}

impl<G: GameEngine, C: Codec> ServerHandle<G, C> {
    /// Number of live sessions in the registry.
    pub fn session_count(&self) -> usize {
        self.state.registry().len()
    }
}

impl<G: GameEngine, C: Codec> Clone for ServerHandle<G, C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

