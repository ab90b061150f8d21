//! Store double with switchable failures, for cache tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{MemoryOrderStore, OrderStore, StoreError};
use crate::models::Order;

#[derive(Debug, Default)]
pub struct ScriptedStore {
    pub inner: MemoryOrderStore,
    pub fail_fetch: AtomicBool,
    pub fail_recent: AtomicBool,
    pub fail_persist: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl ScriptedStore {
    pub fn new(inner: MemoryOrderStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn slow(inner: MemoryOrderStore, delay: Duration) -> Self {
        Self {
            inner,
            delay: Some(delay),
            ..Default::default()
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl OrderStore for ScriptedStore {
    async fn fetch_by_uid(&self, uid: &str) -> Result<Order, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        self.inner.fetch_by_uid(uid).await
    }

    async fn fetch_recent(&self, n: usize) -> Result<Vec<Order>, StoreError> {
        self.pause().await;
        if self.fail_recent.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        self.inner.fetch_recent(n).await
    }

    async fn persist(&self, order: &Order) -> Result<(), StoreError> {
        self.pause().await;
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.persist(order).await
    }
}
