//! Route dispatch server.
//!
//! Serves every request path through the route resolution engine.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http::server ──▶ routing::Dispatcher ──▶ http::response
//!                     (request ID,     (tokenize, descend,     (302 / 401 /
//!                      cookies, IP)     gates, bind, assemble)  404 / 503 / 200)
//!
//!     Cross-cutting: config (load, validate, watch), auth (sessions),
//!                    observability (logs, metrics), lifecycle (shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use route_dispatch::config::load_config;
use route_dispatch::config::watcher::ConfigWatcher;
use route_dispatch::lifecycle::{signals, Shutdown};
use route_dispatch::observability::{logging, metrics};
use route_dispatch::HttpServer;

#[derive(Parser)]
#[command(name = "route-dispatch", version, about = "Route dispatch server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "dispatch.toml")]
    config: PathBuf,

    /// Do not reload the configuration when the file changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let dispatcher = load_config(&args.config)?;
    let config = dispatcher.config().clone();

    logging::init_logging(&config.observability);
    tracing::info!("route-dispatch v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        areas = dispatcher.tree().area_count(),
        methods = dispatcher.tree().method_count(),
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

    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watch_handle = if args.no_watch {
        None
    } else {
        match watcher.run() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable; hot reload disabled");
                None
            }
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    let server = HttpServer::new(dispatcher);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
