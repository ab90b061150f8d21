//! Cache Module
//!
//! Bounded LRU cache of orders with read-through and write-through to the
//! backing store.

mod guard;
mod orchestrator;
mod recency;
mod stats;
mod store;


// Re-export public types
pub use guard::SharedRecencyQueue;
pub use orchestrator::{OrderCache, DEFAULT_STORE_TIMEOUT};
pub use recency::{EntryHandle, PoppedEntry, RecencyQueue};
pub use stats::CacheStats;
pub use store::CacheStore;
