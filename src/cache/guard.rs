//! Concurrency Guard Module
//!
//! Serializes every mutation of the [`RecencyQueue`] behind one mutex so the
//! queue can be shared by any number of callers.

use std::time::Instant;

use parking_lot::Mutex;

use crate::cache::recency::{EntryHandle, PoppedEntry, RecencyQueue};

/// Thread-safe wrapper around [`RecencyQueue`].
///
/// Each call takes the lock for the heap operation only and releases it
/// before returning. The lock is never held across a call into another
/// component.
#[derive(Debug, Default)]
pub struct SharedRecencyQueue {
    inner: Mutex<RecencyQueue>,
}

impl SharedRecencyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RecencyQueue::with_capacity(capacity)),
        }
    }

    pub fn push(&self, key: String, at: Instant) -> EntryHandle {
        self.inner.lock().push(key, at)
    }

    /// Removes the least recently used entry. An empty queue yields None,
    /// which callers treat as nothing to do.
    pub fn pop_min(&self) -> Option<PoppedEntry> {
        self.inner.lock().pop_min()
    }

    pub fn update_priority(&self, handle: EntryHandle, at: Instant) -> bool {
        self.inner.lock().update_priority(handle, at)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Snapshot of live keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys().map(str::to_string).collect()
    }

    #[cfg(test)]
    pub(crate) fn is_well_formed(&self) -> bool {
        self.inner.lock().is_well_formed()
    }
}
