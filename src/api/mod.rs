//! API Module
//!
//! HTTP handlers and routing for the order service read path.
//!
//! # Endpoints
//! - `GET /order/:uid` - Fetch an order through the cache
//! - `POST /orders` - Queue an order document for ingestion
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
