//! Order Cache - bounded LRU cache in front of a durable order store
//!
//! Orders arrive through an ingestion queue and are written through to the
//! store; the HTTP read path reads through the cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::OrderCache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_consumers;
