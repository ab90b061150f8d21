//! Response DTOs for the order service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the ingestion endpoint (POST /orders)
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedResponse {
    /// Acknowledgement message
    pub message: String,
}

impl AcceptedResponse {
    pub fn queued() -> Self {
        Self {
            message: "order queued for ingestion".to_string(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of lookups answered from the cache
    pub hits: u64,
    /// Number of lookups that fell back to the backing store
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Orders inserted by the startup load
    pub loaded: u64,
    /// Current number of orders in cache
    pub total_entries: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a cache statistics snapshot
    pub fn new(stats: &CacheStats, capacity: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            loaded: stats.loaded,
            total_entries: stats.total_entries,
            capacity,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
