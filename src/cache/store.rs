//! Cache Store Module
//!
//! The bounded uid -> order map plus the index from uid to its recency
//! entry. Holds no policy: capacity and eviction are decided by
//! [`OrderCache`](super::OrderCache), which keeps this behind one
//! reader/writer lock.

use std::collections::HashMap;

use crate::cache::recency::EntryHandle;
use crate::models::Order;

// == Cache Store ==
/// What is cached right now. Map and index always hold the same keys.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Cached orders by uid
    orders: HashMap<String, Order>,
    /// Recency entry of each cached uid
    index: HashMap<String, EntryHandle>,
}

impl CacheStore {
    // == Constructor ==
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            orders: HashMap::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    // == Get ==
    /// Returns the cached order and its recency handle.
    pub fn get(&self, uid: &str) -> Option<(&Order, EntryHandle)> {
        let order = self.orders.get(uid)?;
        let handle = *self.index.get(uid)?;
        Some((order, handle))
    }

    // == Put ==
    /// Stores `order` under its uid with `handle`, replacing any previous
    /// order for that uid. Returns the replaced order.
    pub fn put(&mut self, order: Order, handle: EntryHandle) -> Option<Order> {
        let uid = order.order_uid.clone();
        self.index.insert(uid.clone(), handle);
        self.orders.insert(uid, order)
    }

    // == Delete ==
    /// Removes the order and its index entry.
    pub fn delete(&mut self, uid: &str) -> Option<(Order, EntryHandle)> {
        let order = self.orders.remove(uid)?;
        let handle = self.index.remove(uid)?;
        Some((order, handle))
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.orders.contains_key(uid)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.orders.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn index_keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}
