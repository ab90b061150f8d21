//! Order document
//!
//! The cached business entity: an order with its delivery, payment and line
//! items. Field names follow the JSON document published on the order topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// A complete order as received from ingestion and returned to readers.
///
/// Orders are replaced wholesale; nothing in the crate mutates a single field
/// of an order once it has been handed to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Order {
    /// Globally unique order identifier, the cache key
    #[validate(length(min = 1, message = "order_uid is required"))]
    pub order_uid: String,
    #[validate(length(min = 1, message = "track_number is required"))]
    pub track_number: String,
    #[validate(length(min = 1, message = "entry is required"))]
    pub entry: String,
    /// Two-letter locale code
    #[validate(length(equal = 2, message = "locale must be 2 characters"))]
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    #[validate(length(min = 1, message = "customer_id is required"))]
    pub customer_id: String,
    #[validate(length(min = 1, message = "delivery_service is required"))]
    pub delivery_service: String,
    #[serde(default)]
    pub shardkey: String,
    #[serde(default)]
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub oof_shard: String,
    #[validate(nested)]
    pub delivery: Delivery,
    #[validate(nested)]
    pub payment: Payment,
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    #[validate(nested)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Delivery {
    #[validate(length(min = 1, message = "delivery name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_e164", message = "phone must be in E.164 format"))]
    pub phone: String,
    #[serde(default)]
    pub zip: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[serde(default)]
    pub region: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Payment {
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub amount: i64,
    pub payment_dt: DateTime<Utc>,
    #[serde(default)]
    pub bank: String,
    #[validate(range(min = 0, message = "delivery_cost must not be negative"))]
    pub delivery_cost: i64,
    #[validate(range(min = 0, message = "goods_total must not be negative"))]
    pub goods_total: i64,
    #[serde(default)]
    pub custom_fee: i64,
}

/// A single order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Item {
    #[validate(length(min = 1, message = "rid is required"))]
    pub rid: String,
    #[serde(default)]
    pub chrt_id: i64,
    #[serde(default)]
    pub track_number: String,
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: i64,
    #[validate(length(min = 1, message = "item name is required"))]
    pub name: String,
    #[validate(range(min = 0, message = "sale must not be negative"))]
    pub sale: i64,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub total_price: i64,
    #[serde(default)]
    pub nm_id: i64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub status: i64,
}

// E.164: leading '+', then 2 to 15 digits with a non-zero country code
fn validate_e164(phone: &str) -> Result<(), ValidationError> {
    let digits = phone
        .strip_prefix('+')
        .ok_or_else(|| ValidationError::new("e164"))?;

    let well_formed = (2..=15).contains(&digits.len())
        && !digits.starts_with('0')
        && digits.bytes().all(|b| b.is_ascii_digit());

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("e164"))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// Builds a valid order whose creation time is `created_secs` after the epoch.
    pub fn order_created_at(uid: &str, created_secs: i64) -> Order {
        let created = Utc
            .timestamp_opt(1_700_000_000 + created_secs, 0)
            .single()
            .expect("valid timestamp");

        Order {
            order_uid: uid.to_string(),
            track_number: "WBILMTESTTRACK".to_string(),
            entry: "WBIL".to_string(),
            locale: "en".to_string(),
            internal_signature: String::new(),
            customer_id: "test".to_string(),
            delivery_service: "meest".to_string(),
            shardkey: "9".to_string(),
            sm_id: 99,
            date_created: created,
            oof_shard: "1".to_string(),
            delivery: Delivery {
                name: "Test Testov".to_string(),
                phone: "+9720000000".to_string(),
                zip: "2639809".to_string(),
                city: "Kiryat Mozkin".to_string(),
                address: "Ploshad Mira 15".to_string(),
                region: "Kraiot".to_string(),
                email: "test@gmail.com".to_string(),
            },
            payment: Payment {
                transaction: uid.to_string(),
                request_id: String::new(),
                currency: "USD".to_string(),
                provider: "wbpay".to_string(),
                amount: 1817,
                payment_dt: created,
                bank: "alpha".to_string(),
                delivery_cost: 1500,
                goods_total: 317,
                custom_fee: 0,
            },
            items: vec![Item {
                rid: format!("{}-item", uid),
                chrt_id: 9934930,
                track_number: "WBILMTESTTRACK".to_string(),
                price: 453,
                name: "Mascaras".to_string(),
                sale: 30,
                size: "0".to_string(),
                total_price: 317,
                nm_id: 2389212,
                brand: "Vivienne Sabo".to_string(),
                status: 202,
            }],
        }
    }

    pub fn order(uid: &str) -> Order {
        order_created_at(uid, 0)
    }
}
