//! Order records and the order-creation payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BookId, Email, OrderId, Price};

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub city: String,
    pub country: String,
    pub state: String,
    pub zipcode: String,
}

/// Payload sent to `POST /api/v1/orders/`.
///
/// Built from a validated checkout form by [`crate::checkout::build_order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub name: String,
    pub email: Email,
    pub address: ShippingAddress,
    pub phone: String,
    pub product_ids: Vec<BookId>,
    pub total_price: Price,
}

/// An order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub name: String,
    pub email: String,
    pub address: ShippingAddress,
    #[serde(deserialize_with = "phone_from_string_or_number")]
    pub phone: String,
    #[serde(default)]
    pub product_ids: Vec<BookId>,
    pub total_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The backend stores phone numbers as numbers; accept either form.
fn phone_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected phone as string or number, got {other}"
        ))),
    }
}
