//! Order validation
//!
//! Validation is an explicit value handed to whoever needs it instead of a
//! process-wide instance.

use validator::Validate;

use crate::error::{CacheError, Result};
use crate::models::Order;

/// Stateless validator applied to decoded orders before they are saved.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderValidator;

impl OrderValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks every declared field rule, including nested delivery, payment
    /// and items.
    pub fn validate(&self, order: &Order) -> Result<()> {
        order
            .validate()
            .map_err(|errors| CacheError::InvalidRecord(errors.to_string()))
    }

    /// Decodes a raw JSON document and validates it.
    pub fn decode(&self, payload: &[u8]) -> Result<Order> {
        let order: Order = serde_json::from_slice(payload)
            .map_err(|e| CacheError::InvalidRecord(format!("malformed order document: {}", e)))?;
        self.validate(&order)?;
        Ok(order)
    }
}
