//! Order Cache
//!
//! Read-through, write-through LRU cache in front of an [`OrderStore`].
//!
//! # Consistency
//! The cache is only touched after the backing store has answered
//! successfully, so every cached order has been durably committed. A failed
//! or cancelled store call leaves the cache exactly as it was.
//!
//! # Locking
//! Two locks: the [`CacheStore`] reader/writer lock and the recency queue
//! mutex. They are always taken store first, queue second. No lock is held
//! across a backing-store call.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::guard::SharedRecencyQueue;
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheStats, CacheStore};
use crate::error::{CacheError, Result};
use crate::models::Order;
use crate::store::{OrderStore, StoreError};

/// Default bound on a single backing-store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

// == Order Cache ==
/// Bounded LRU cache of orders shared by the ingestion and read paths.
pub struct OrderCache {
    store: Arc<dyn OrderStore>,
    entries: RwLock<CacheStore>,
    recency: SharedRecencyQueue,
    stats: StatsRecorder,
    capacity: usize,
    store_timeout: Duration,
}

impl OrderCache {
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` orders.
    pub fn new(store: Arc<dyn OrderStore>, capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            store,
            entries: RwLock::new(CacheStore::with_capacity(capacity)),
            recency: SharedRecencyQueue::with_capacity(capacity),
            stats: StatsRecorder::default(),
            capacity,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Overrides the bound on each backing-store call.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    // == Load ==
    /// Warms the cache with the `capacity` most recently created orders.
    ///
    /// Recency of loaded orders starts at load time, so a restart resets LRU
    /// order to load order. Returns the number of orders inserted; zero means
    /// the store is empty, a fetch failure is
    /// [`CacheError::BackingStoreUnavailable`].
    pub async fn load(&self, cancel: &CancellationToken) -> Result<usize> {
        let orders = self
            .call_store(Some(cancel), "load recent orders", async {
                self.store.fetch_recent(self.capacity).await
            })
            .await?
            .map_err(CacheError::BackingStoreUnavailable)?;

        let count = orders.len();
        {
            let mut entries = self.entries.write().await;
            for order in orders {
                self.insert_locked(&mut entries, order);
            }
        }

        self.stats.record_loaded(count);
        info!(orders_loaded = count, capacity = self.capacity, "Cache loaded from backing store");
        Ok(count)
    }

    // == Get ==
    /// Returns the order for `uid`, reading through to the backing store on
    /// a miss.
    ///
    /// A hit refreshes the order's recency. A miss that the store resolves
    /// inserts the order, evicting the least recently used one if full.
    pub async fn get(&self, uid: &str) -> Result<Order> {
        {
            let entries = self.entries.read().await;
            if let Some((order, handle)) = entries.get(uid) {
                // Promotion under the store read lock: eviction needs the
                // write lock, so the handle cannot go stale here
                self.recency.update_priority(handle, Instant::now());
                self.stats.record_hit();
                debug!(order_uid = uid, "Cache hit");
                return Ok(order.clone());
            }
        }

        self.stats.record_miss();
        debug!(order_uid = uid, "Cache miss, reading through");

        let fetched = self
            .call_store(None, "fetch order", async {
                self.store.fetch_by_uid(uid).await
            })
            .await?;

        match fetched {
            Ok(order) => {
                self.insert(order.clone()).await;
                Ok(order)
            }
            Err(StoreError::NotFound(_)) => Err(CacheError::NotFound(uid.to_string())),
            Err(e) => {
                warn!(order_uid = uid, error = %e, "Backing store fetch failed");
                Err(CacheError::backing_store(format!("fetch order {}", uid), e))
            }
        }
    }

    // == Save ==
    /// Persists `order` to the backing store, then caches it.
    ///
    /// On any store failure or cancellation the cache is left untouched.
    pub async fn save(&self, cancel: &CancellationToken, order: Order) -> Result<()> {
        let persisted = self
            .call_store(Some(cancel), "persist order", async {
                self.store.persist(&order).await
            })
            .await?;

        if let Err(e) = persisted {
            error!(order_uid = %order.order_uid, error = %e, "Failed to save order to backing store");
            return Err(CacheError::backing_store(
                format!("persist order {}", order.order_uid),
                e,
            ));
        }

        self.insert(order).await;
        Ok(())
    }

    // == Accessors ==
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether `uid` is cached, without touching its recency.
    pub async fn contains(&self, uid: &str) -> bool {
        self.entries.read().await.contains(uid)
    }

    pub async fn stats(&self) -> CacheStats {
        let total_entries = self.len().await;
        self.stats.snapshot(total_entries)
    }

    // == Insert With Eviction ==
    async fn insert(&self, order: Order) {
        let mut entries = self.entries.write().await;
        self.insert_locked(&mut entries, order);
    }

    fn insert_locked(&self, entries: &mut CacheStore, order: Order) {
        let now = Instant::now();

        // Already cached (e.g. two misses on one uid): replace in place,
        // the queue must never see the same key twice
        let existing = entries.get(&order.order_uid).map(|(_, handle)| handle);
        if let Some(handle) = existing {
            self.recency.update_priority(handle, now);
            entries.put(order, handle);
            return;
        }

        if entries.len() >= self.capacity {
            if let Some(evicted) = self.recency.pop_min() {
                entries.delete(&evicted.key);
                self.stats.record_eviction();
                info!(order_uid = %evicted.key, "Evicting order from cache");
            }
        }

        let uid = order.order_uid.clone();
        let handle = self.recency.push(uid.clone(), now);
        entries.put(order, handle);
        debug!(order_uid = %uid, "Order added to cache");
    }

    // == Backing Store Calls ==
    /// Runs a store call bounded by the store timeout and, if given, the
    /// caller's cancellation token.
    ///
    /// The outer error is cancellation; the inner result is the store's own
    /// answer, with a timeout reported as a backend failure.
    async fn call_store<T, F>(
        &self,
        cancel: Option<&CancellationToken>,
        what: &str,
        call: F,
    ) -> Result<std::result::Result<T, StoreError>>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        let bounded = tokio::time::timeout(self.store_timeout, call);

        let outcome = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(operation = what, "Store call cancelled by caller");
                        return Err(CacheError::Cancelled(what.to_string()));
                    }
                    outcome = bounded => outcome,
                }
            }
            None => bounded.await,
        };

        Ok(outcome.unwrap_or_else(|_| {
            Err(StoreError::Backend(format!(
                "{} timed out after {:?}",
                what, self.store_timeout
            )))
        }))
    }

    /// True when the store map, the index and the recency queue all hold
    /// exactly the same keys.
    #[cfg(test)]
    pub(crate) async fn is_consistent(&self) -> bool {
        use std::collections::HashSet;

        let entries = self.entries.read().await;
        let cached: HashSet<&str> = entries.keys().collect();
        let indexed: HashSet<&str> = entries.index_keys().collect();
        let queued = self.recency.keys();
        let queued_set: HashSet<&str> = queued.iter().map(String::as_str).collect();

        cached == indexed
            && cached == queued_set
            && queued.len() == queued_set.len()
            && self.recency.is_well_formed()
    }
}

impl std::fmt::Debug for OrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCache")
            .field("capacity", &self.capacity)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}
