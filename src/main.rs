//! Aegis AI Gateway
//!
//! Control plane in front of an AI-processing backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 AEGIS GATEWAY                 │
//!                        │                                               │
//!    Client Request      │  ┌────────┐   ┌────────┐   ┌─────────────┐   │
//!    ────────────────────┼─▶│  http  │──▶│  auth  │──▶│  security   │   │
//!                        │  │ server │   │ keys/  │   │ rate limit  │   │
//!                        │  └────────┘   │ tokens │   │ kill switch │   │
//!                        │               └────────┘   └──────┬──────┘   │
//!                        │                                   │          │
//!                        │                                   ▼          │
//!    Client Response     │  ┌────────┐                ┌─────────────┐   │     AI
//!    ◀───────────────────┼──│ error  │◀───────────────│   routing   │◀──┼──── Backend
//!                        │  │taxonomy│                │  dispatch   │   │
//!                        │  └────────┘                └─────────────┘   │
//!                        │                                               │
//!                        │  ┌─────────────────────────────────────────┐ │
//!                        │  │           Cross-Cutting Concerns         │ │
//!                        │  │  ┌────────┐ ┌────────┐ ┌─────────────┐  │ │
//!                        │  │  │ config │ │ health │ │  storage    │  │ │
//!                        │  │  │        │ │monitor │ │ (JSON state)│  │ │
//!                        │  │  └────────┘ └────────┘ └─────────────┘  │ │
//!                        │  └─────────────────────────────────────────┘ │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aegis_gateway::auth::StaticIdentityProvider;
use aegis_gateway::config::loader::load_config;
use aegis_gateway::lifecycle::{self, Shutdown};
use aegis_gateway::{Gateway, HttpServer};

/// AI-request gateway: authentication, rate limiting, health monitoring,
/// and priority-aware routing in front of an AI backend.
#[derive(Debug, Parser)]
#[command(name = "aegis-gateway", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the durable-state directory.
    #[arg(long)]
    state_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aegis_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "aegis-gateway starting");

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(state_dir) = cli.state_dir {
        config.storage.state_dir = state_dir;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.base_url,
        state_dir = %config.storage.state_dir,
        rate_window_secs = config.rate_limit.window_secs,
        rate_max_requests = config.rate_limit.max_requests,
        "configuration loaded"
    );

    let gateway = Arc::new(Gateway::new(&config).await?);
    let identity = Arc::new(StaticIdentityProvider::from_config(&config.auth));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            lifecycle::wait_for_signal().await;
            shutdown.trigger();
        });
    }

    let server = HttpServer::new(config, gateway, identity);
    server.run(listener, &shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
