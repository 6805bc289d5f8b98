//! Redirect server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────┐
//!                    │               REDIRECT SERVER               │
//!                    │                                             │
//!   Client Request   │  ┌─────────┐    ┌───────────────────────┐  │
//!   ─────────────────┼─▶│  http   │───▶│  redirects engine     │  │
//!                    │  │ server  │    │  (ordered rule scan)  │  │
//!                    │  └─────────┘    └──────────┬────────────┘  │
//!                    │                            │               │
//!                    │            match ──▶ 307 + Location        │
//!                    │            no match ──▶ site fallback      │
//!                    │                                             │
//!                    │  ┌──────────────────────────────────────┐  │
//!                    │  │        Cross-Cutting Concerns         │  │
//!                    │  │  config · observability · lifecycle   │  │
//!                    │  └──────────────────────────────────────┘  │
//!                    └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redirect_server::config::{self, ServerConfig};
use redirect_server::http::HttpServer;
use redirect_server::lifecycle::Shutdown;
use redirect_server::redirects::RedirectEngine;

#[derive(Debug, Parser)]
#[command(name = "redirect-server", about = "Personal-site edge server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config/server.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redirect_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("redirect-server v0.1.0 starting");

    let args = Args::parse();

    let config = if args.config.exists() {
        config::load_config(&args.config)?
    } else {
        tracing::info!(path = %args.config.display(), "config file not found, using defaults");
        ServerConfig::default()
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "configuration loaded"
    );

    // Compile the redirect rules once; they are immutable for the
    // life of the process.
    let rules_text = config::load_rules_text(&config)?;
    let (engine, report) = RedirectEngine::from_rules_text(&rules_text);
    tracing::info!(
        compiled = report.compiled,
        dropped = report.dropped.len(),
        "redirect rules compiled"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => redirect_server::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(engine));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
