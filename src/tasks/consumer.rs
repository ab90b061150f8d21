//! Order Ingestion Task
//!
//! Workers that drain raw order documents from a message source, decode and
//! validate them, and hand them to [`OrderCache::save`].
//!
//! Hand-off is at-most-once: a message that fails to decode, validate or
//! save is logged and dropped, never retried.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::OrderCache;
use crate::error::{CacheError, Result};
use crate::models::OrderValidator;

// == Message Source ==
/// Delivers raw order documents to the ingestion workers.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Next message payload, or None once the source is closed and drained.
    async fn recv(&self) -> Option<Vec<u8>>;
}

/// Receiving half of the in-process ingestion queue.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&self) -> Option<Vec<u8>> {
        self.rx.lock().await.recv().await
    }
}

/// Sending half of the in-process ingestion queue.
#[derive(Debug, Clone)]
pub struct OrderPublisher {
    tx: mpsc::Sender<Vec<u8>>,
}

impl OrderPublisher {
    /// Enqueues one raw order document, waiting if the queue is full.
    pub async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| CacheError::QueueClosed)
    }
}

/// Creates a bounded ingestion queue holding up to `capacity` messages.
pub fn ingest_channel(capacity: usize) -> (OrderPublisher, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        OrderPublisher { tx },
        ChannelSource { rx: Mutex::new(rx) },
    )
}

// == Message Handling ==
/// Decodes, validates and saves one message.
pub async fn process_message(
    cache: &OrderCache,
    validator: &OrderValidator,
    cancel: &CancellationToken,
    payload: &[u8],
) -> Result<String> {
    let order = validator.decode(payload)?;
    let uid = order.order_uid.clone();
    cache.save(cancel, order).await?;
    Ok(uid)
}

// == Worker Spawning ==
/// Spawns `workers` ingestion workers sharing `source`.
///
/// Workers exit when `shutdown` fires or the source is closed. Saves use
/// `shutdown` as their cancellation context.
///
/// # Returns
/// One JoinHandle per worker.
pub fn spawn_consumers(
    workers: usize,
    source: Arc<dyn MessageSource>,
    cache: Arc<OrderCache>,
    validator: OrderValidator,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..workers.max(1))
        .map(|worker| {
            let source = Arc::clone(&source);
            let cache = Arc::clone(&cache);
            let shutdown = shutdown.clone();

            tokio::spawn(async move {
                info!(worker, "Ingestion worker started");

                loop {
                    let payload = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        message = source.recv() => match message {
                            Some(payload) => payload,
                            None => break,
                        },
                    };

                    match process_message(&cache, &validator, &shutdown, &payload).await {
                        Ok(uid) => debug!(worker, order_uid = %uid, "Order ingested"),
                        Err(e @ CacheError::InvalidRecord(_)) => {
                            warn!(worker, error = %e, "Dropping invalid order message");
                        }
                        Err(e) => error!(worker, error = %e, "Failed to save order"),
                    }
                }

                info!(worker, "Ingestion worker stopped");
            })
        })
        .collect()
}
