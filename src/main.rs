//! Storefront web front end.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ /health ──▶ health aggregator ──▶ probes
//!                          │
//!                          └──▶ conventional route ──▶ controllers
//!                                                         │
//!                                                         ▼
//!                                                  ECommerceService
//!                                                         │
//!                                                         ▼
//!                                   resilient executor (retry + circuit breaker)
//!                                                         │
//!                                                         ▼
//!                                      shared pooled client ──▶ products / orders APIs
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storefront::config::{load_config, load_from_env};
use storefront::lifecycle::signals::wait_for_signal;
use storefront::observability::logging::init_logging;
use storefront::{Application, Shutdown};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "E-commerce web front end with resilient downstream calls", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment overrides when absent.
    #[arg(short, long, env = "STOREFRONT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    init_logging(&config.observability)?;

    tracing::info!("storefront v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let app = Application::build(config)?;
    let shutdown = Shutdown::new();

    let server = app.run(listener, &shutdown);
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        signal = wait_for_signal() => {
            let name = signal?;
            tracing::info!(signal = name, "Shutdown signal received");
            shutdown.trigger();
            server.await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
