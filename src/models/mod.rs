//! Domain and transport models
//!
//! The order document cached by the service, its validator, and the DTOs
//! used for HTTP response bodies.

pub mod order;
pub mod responses;
pub mod validation;

// Re-export commonly used types
pub use order::{Delivery, Item, Order, Payment};
pub use responses::{AcceptedResponse, HealthResponse, StatsResponse};
pub use validation::OrderValidator;
