//! Number verification service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (request id, timeout, trace)
//!                  │
//!                  ▼
//!               security::rate_limit (token bucket per client key)
//!                  │
//!                  ▼
//!               verification::resolver (plain or hashed candidate)
//!                  │
//!                  ▼
//!               verification::client
//!                  ├─▶ primary provider   (circuit breaker + retry)
//!                  └─▶ fallback provider  (on any primary failure)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use number_verification::config::{load_config, ServiceConfig};
use number_verification::lifecycle::{wait_for_termination, Shutdown};
use number_verification::observability::{logging, metrics};
use number_verification::verification::build_provider_client;
use number_verification::HttpServer;

#[derive(Parser)]
#[command(name = "number-verification")]
#[command(about = "Phone number verification service", version)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "NUMBER_VERIFICATION_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "number-verification starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        primary = %config.providers.primary.base_url,
        fallback = %config.providers.fallback.base_url,
        rate_limit_enabled = config.rate_limit.enabled,
        requests_per_window = config.rate_limit.requests_per_window,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let client = Arc::new(build_provider_client(&config)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        match wait_for_termination().await {
            Ok(()) => shutdown.trigger(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for termination signals");
                // Dropping the coordinator would close the channel and stop the server.
                std::future::pending::<()>().await;
            }
        }
    });

    let server = HttpServer::new(config, client);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
