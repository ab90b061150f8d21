//! API Handlers
//!
//! HTTP request handlers for the order service endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::OrderCache;
use crate::error::Result;
use crate::models::{AcceptedResponse, HealthResponse, Order, StatsResponse};
use crate::tasks::OrderPublisher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Order cache serving the read path
    pub cache: Arc<OrderCache>,
    /// Ingestion queue fed by POST /orders
    pub publisher: OrderPublisher,
}

impl AppState {
    pub fn new(cache: Arc<OrderCache>, publisher: OrderPublisher) -> Self {
        Self { cache, publisher }
    }
}

/// Handler for GET /order/:uid
///
/// Returns the order as JSON. Not-Found becomes 404, any other failure a
/// generic 500.
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<Order>> {
    let order = state.cache.get(&uid).await?;
    Ok(Json(order))
}

/// Handler for POST /orders
///
/// Queues a raw order document for the ingestion workers. Decoding and
/// validation happen in the workers.
pub async fn ingest_order_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    state.publisher.publish(body.to_vec()).await?;
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse::queued())))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    Json(StatsResponse::new(&stats, state.cache.capacity()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
