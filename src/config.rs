//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CACHE_CAPACITY: usize = 1000;
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_CONSUMER_WORKERS: usize = 1;
const DEFAULT_INGEST_QUEUE_SIZE: usize = 1024;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of orders held in the cache
    pub cache_capacity: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Number of ingestion workers draining the queue
    pub consumer_workers: usize,
    /// Bound of the ingestion queue
    pub ingest_queue_size: usize,
    /// Upper bound for a single backing-store call in milliseconds
    pub store_timeout_ms: u64,
    /// Journal file for the order store; None keeps orders in memory only
    pub store_journal_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cached orders (default: 1000, must be > 0)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `CONSUMER_WORKERS` - Ingestion worker count (default: 1)
    /// - `INGEST_QUEUE_SIZE` - Ingestion queue bound (default: 1024)
    /// - `STORE_TIMEOUT_MS` - Backing-store call timeout (default: 5000)
    /// - `STORE_JOURNAL_PATH` - Order journal file (default: unset)
    pub fn from_env() -> Self {
        Self {
            cache_capacity: positive_var("CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            consumer_workers: positive_var("CONSUMER_WORKERS", DEFAULT_CONSUMER_WORKERS),
            ingest_queue_size: positive_var("INGEST_QUEUE_SIZE", DEFAULT_INGEST_QUEUE_SIZE),
            store_timeout_ms: env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_STORE_TIMEOUT_MS),
            store_journal_path: env::var("STORE_JOURNAL_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Backing-store timeout as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn positive_var(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            server_port: DEFAULT_SERVER_PORT,
            consumer_workers: DEFAULT_CONSUMER_WORKERS,
            ingest_queue_size: DEFAULT_INGEST_QUEUE_SIZE,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            store_journal_path: None,
        }
    }
}
