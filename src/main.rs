//! Image edge service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ middleware (request id, trace, CORS, timeout, body limit)
//!                   │
//!                   ▼
//!               rate limiter ──▶ bounded cache
//!                   │
//!                   ▼
//!               route classifier
//!        ┌──────────┼──────────────┬───────────────┐
//!        ▼          ▼              ▼               ▼
//!     upload     listing        image fetch     pages/static
//!        │          │  ▲           │  ▲
//!        ▼          ▼  │           ▼  │
//!     ┌──────────────────────┐   edge cache
//!     │   WebDAV storage     │◀─────┘
//!     └──────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use image_edge::config::load_config_with;
use image_edge::lifecycle::{wait_for_signal, Shutdown};
use image_edge::observability::{logging, metrics};
use image_edge::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "image-edge", version, about = "Image upload and delivery edge service")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config_with(args.config.as_deref(), |config| {
        if let Some(bind) = args.bind {
            config.listener.bind_address = bind;
        }
    })?;

    if args.check {
        println!("Configuration OK: {:?}", config);
        return Ok(());
    }

    logging::init(&config.observability);
    tracing::info!("image-edge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upload_page_path = %config.site.upload_page_path,
        rate_limit_enabled = config.rate_limit.enabled,
        edge_cache_enabled = config.edge_cache.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::from_config(config)?;

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
