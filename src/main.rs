//! Order Cache - bounded LRU cache in front of a durable order store
//!
//! Orders arrive through an ingestion queue and are written through to the
//! store; the HTTP read path reads through the cache.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_cache::api::create_router;
use order_cache::models::OrderValidator;
use order_cache::store::{MemoryOrderStore, OrderStore};
use order_cache::tasks::ingest_channel;
use order_cache::{spawn_consumers, AppState, Config, OrderCache};

/// Main entry point for the order service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the backing order store
/// 4. Warm the cache; a failed load aborts startup
/// 5. Start ingestion workers
/// 6. Serve HTTP until SIGINT/SIGTERM, then stop the workers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting order cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_capacity={}, port={}, consumer_workers={}, store_timeout={}ms",
        config.cache_capacity, config.server_port, config.consumer_workers, config.store_timeout_ms
    );

    let store: Arc<dyn OrderStore> = match &config.store_journal_path {
        Some(path) => Arc::new(
            MemoryOrderStore::open(path)
                .await
                .with_context(|| format!("failed to open order journal {}", path.display()))?,
        ),
        None => {
            warn!("STORE_JOURNAL_PATH not set, orders are kept in memory only");
            Arc::new(MemoryOrderStore::new())
        }
    };

    let capacity =
        NonZeroUsize::new(config.cache_capacity).context("cache capacity must be positive")?;
    let cache = Arc::new(
        OrderCache::new(store, capacity).with_store_timeout(config.store_timeout()),
    );

    let shutdown = CancellationToken::new();
    let loaded = cache
        .load(&shutdown)
        .await
        .context("failed to load cache from backing store")?;
    info!("Cache populated with {} orders", loaded);

    let (publisher, source) = ingest_channel(config.ingest_queue_size);
    let workers = spawn_consumers(
        config.consumer_workers,
        Arc::new(source),
        cache.clone(),
        OrderValidator::new(),
        shutdown.clone(),
    );
    info!("{} ingestion workers started", workers.len());

    let app = create_router(AppState::new(cache, publisher));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server failed")?;

    stop_workers(workers).await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    shutdown.cancel();
}

async fn stop_workers(workers: Vec<JoinHandle<()>>) {
    for worker in workers {
        if let Err(e) = worker.await {
            warn!("Ingestion worker ended abnormally: {}", e);
        }
    }
}
