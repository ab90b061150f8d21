//! Error types for the order cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for the order cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Order is absent from both the cache and the backing store
    #[error("order {0} not found")]
    NotFound(String),

    /// The backing store failed while serving a request
    #[error("backing store error: {context}: {source}")]
    BackingStore {
        context: String,
        #[source]
        source: StoreError,
    },

    /// The startup load could not fetch from the backing store
    #[error("backing store unavailable during cache load: {0}")]
    BackingStoreUnavailable(#[source] StoreError),

    /// The caller cancelled before the backing store answered
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Order document failed decoding or validation
    #[error("invalid order: {0}")]
    InvalidRecord(String),

    /// Ingestion queue no longer accepts messages
    #[error("ingestion queue closed")]
    QueueClosed,
}

impl CacheError {
    /// Wraps a store failure with a description of what was attempted.
    pub fn backing_store(context: impl Into<String>, source: StoreError) -> Self {
        CacheError::BackingStore {
            context: context.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            CacheError::InvalidRecord(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            CacheError::QueueClosed => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            _ => {
                error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the order cache.
pub type Result<T> = std::result::Result<T, CacheError>;
