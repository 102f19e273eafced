//! Failover file front end (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                 FAILOVER FILES                    │
//!                         │                                                   │
//!   Load balancer probe   │  ┌─────────┐    ┌──────────────┐    ┌──────────┐  │
//!   ──────────────────────┼─▶│  http   │───▶│    health    │───▶│ storage  │──┼──▶ Blob service
//!   GET /health           │  │ server  │    │state machine │    │BlobStore │  │   (status container)
//!                         │  └────┬────┘    └──────────────┘    └────▲─────┘  │
//!   Browser / operator    │       │                                  │        │
//!   ──────────────────────┼───────┴──── files / info handlers ───────┘        │   (files container)
//!                         │                                                   │
//!                         │  ┌─────────────────────────────────────────────┐  │
//!                         │  │ config (+hot reload) · observability ·      │  │
//!                         │  │ lifecycle (startup / signals / shutdown)    │  │
//!                         │  └─────────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use failover_files::config;
use failover_files::health::SystemClock;
use failover_files::lifecycle::{
    build_blob_store, provision_containers, wait_for_signal, Shutdown,
};
use failover_files::observability::{logging, metrics};
use failover_files::HttpServer;

#[derive(Parser)]
#[command(name = "failover-files")]
#[command(about = "Blob-backed file front end with a failover health toggle", long_about = None)]
struct Args {
    /// TOML configuration file; watched for changes when given
    #[arg(short, long, env = "FAILOVER_FILES_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = config::load(args.config.as_deref())?;
    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "failover-files starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = ?config.storage.backend,
        files_container = %config.storage.files_container,
        status_container = %config.storage.status_container,
        region = %config.region.region,
        unhealthy_duration_secs = config.health.unhealthy_duration_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let blobs = build_blob_store(&config.storage)?;
    provision_containers(blobs.as_ref(), &config.storage).await;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Without a config file there is nothing to watch; the sender is
    // dropped and the reload task ends immediately.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = config::ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::error!(error = %e, "Config watcher failed to start, hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, blobs, Arc::new(SystemClock));
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.signal()));

    let signal = wait_for_signal().await;
    shutdown.trigger(signal);

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
