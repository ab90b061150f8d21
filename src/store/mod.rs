//! Backing Store Module
//!
//! The durable system of record the cache reads through and writes through.
//! The cache only ever talks to it via [`OrderStore`].

mod memory;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Order;

pub use memory::MemoryOrderStore;

// == Store Error ==
/// Failures reported by a backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No order with this uid is stored
    #[error("order {0} does not exist in the store")]
    NotFound(String),

    /// An order with this uid is already stored
    #[error("order {0} already exists in the store")]
    Conflict(String),

    /// I/O or driver failure
    #[error("{0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

// == Order Store Trait ==
/// Durable order storage consumed by the cache.
///
/// A successful [`persist`](OrderStore::persist) must be visible to every
/// later [`fetch_by_uid`](OrderStore::fetch_by_uid) and
/// [`fetch_recent`](OrderStore::fetch_recent).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetches one order, `StoreError::NotFound` if it does not exist.
    async fn fetch_by_uid(&self, uid: &str) -> Result<Order, StoreError>;

    /// Fetches up to `n` orders with the newest `date_created` first.
    async fn fetch_recent(&self, n: usize) -> Result<Vec<Order>, StoreError>;

    /// Durably stores a new order.
    async fn persist(&self, order: &Order) -> Result<(), StoreError>;
}
