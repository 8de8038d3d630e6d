//! Catalog records.
//!
//! Field names follow the backend's JSON (`camelCase`, `_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::types::{BookId, Price};

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub trending: bool,
    #[serde(default)]
    pub cover_image: String,
    pub old_price: Price,
    pub new_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Book {
    /// Build a single-quantity cart line at the current selling price.
    #[must_use]
    pub fn to_cart_item(&self) -> CartItem {
        CartItem::new(self.id.clone(), self.title.clone(), self.new_price)
    }

    /// Whether the book is discounted against its list price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.new_price < self.old_price
    }
}

/// Payload for creating a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub description: String,
    pub category: String,
    pub trending: bool,
    pub cover_image: String,
    pub old_price: Price,
    pub new_price: Price,
}

/// Partial update for an existing book. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trending: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_price: Option<Price>,
}

impl BookUpdate {
    /// True when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.trending.is_none()
            && self.cover_image.is_none()
            && self.old_price.is_none()
            && self.new_price.is_none()
    }
}
