//! # StackIt Server
//!
//! Entry point for the StackIt Q&A forum backend.
//!
//! ## Startup Sequence
//!
//! 1. Install the log subscriber
//! 2. Load configuration from the environment and validate it
//! 3. Open the document store (memory or RocksDB)
//! 4. Wire metrics, the notification hub and the forum service
//! 5. Serve HTTP and WebSocket traffic until SIGINT/SIGTERM

mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use stackit_api::{
    ApiGatewayService, GatewayConfig, GatewayMetrics, NotificationHub, StorageBackend,
};
use stackit_forum::{ForumService, InMemoryKVStore, KeyValueStore, SystemTimeSource};

/// Open the configured backend.
fn open_store(config: &GatewayConfig) -> Result<Box<dyn KeyValueStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Ok(Box::new(InMemoryKVStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let path = config.storage.data_dir.clone();
            let store = stackit_forum::RocksDbStore::open(stackit_forum::RocksDbConfig::at(&path))
                .with_context(|| format!("Failed to open RocksDB at {}", path.display()))?;
            info!("Opened RocksDB store at {}", path.display());
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => anyhow::bail!(
            "STACKIT_STORAGE=rocksdb requires building stackit-server with --features rocksdb"
        ),
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_logging()?;

    let config = GatewayConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("===========================================");
    info!("  StackIt Server v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!("HTTP: {}", config.http_addr());
    info!("Storage: {:?}", config.storage.backend);

    let store = open_store(&config)?;
    let metrics = Arc::new(GatewayMetrics::new());
    let hub = Arc::new(NotificationHub::new(
        config.websocket.room_buffer,
        Arc::clone(&metrics),
    ));
    let forum = Arc::new(ForumService::new(
        store,
        Arc::new(SystemTimeSource),
        hub.clone(),
    ));

    let gateway = ApiGatewayService::new(config, forum, hub, metrics)
        .context("Failed to build gateway")?;
    gateway.serve(shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}
