//! Connect Four relay server.
//!
//! Serves the relay over WebSockets until Ctrl-C. Point the browser
//! client at `ws://<bind>/`.

use std::time::Duration;

use clap::Parser;
use linefour::prelude::*;

/// Command-line options. Each flag falls back to an environment variable.
#[derive(Debug, Parser)]
#[command(name = "connect-four", version, about = "Real-time Connect Four relay")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "LINEFOUR_BIND", default_value = "0.0.0.0:8001")]
    bind: String,

    /// Seconds a new connection may take to send its `init`.
    #[arg(long, env = "LINEFOUR_HANDSHAKE_TIMEOUT_SECS", default_value_t = 5)]
    handshake_timeout_secs: u64,

    /// Bytes of entropy per invite token (at least 16).
    #[arg(
        long,
        env = "LINEFOUR_TOKEN_BYTES",
        default_value_t = MIN_TOKEN_BYTES,
        value_parser = parse_token_bytes
    )]
    token_bytes: usize,
}

fn parse_token_bytes(raw: &str) -> Result<usize, String> {
    let bytes: usize = raw.parse().map_err(|e| format!("{e}"))?;
    SessionConfig { token_bytes: bytes }
        .validate()
        .map_err(|e| e.to_string())?;
    Ok(bytes)
}

impl Args {
    fn config(&self) -> RelayConfig {
        RelayConfig {
            bind_addr: self.bind.clone(),
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            session: SessionConfig {
                token_bytes: self.token_bytes,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("connect-four relay v{} starting", env!("CARGO_PKG_VERSION"));

    let server = RelayServerBuilder::new()
        .config(args.config())
        .build::<ConnectFour>()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await
}
