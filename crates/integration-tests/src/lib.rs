//! Integration tests for the bookstore storefront client.
//!
//! Every test runs a [`wiremock`] server standing in for the backend and
//! drives a real [`Store`] against it over HTTP.
//!
//! # Test Categories
//!
//! - `books_cache` - Catalog reads, tag invalidation and de-duplication
//! - `auth` - Bearer token handling across sign-in and sign-out
//! - `checkout` - Order placement end to end
//!
//! Set `RUST_LOG=bookstore_storefront=debug` to see cache decisions.

use std::sync::Once;

use bookstore_storefront::{Store, StoreConfig};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use url::Url;
use wiremock::MockServer;

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Configuration pointing at `server`.
///
/// # Panics
///
/// Panics if the mock server URI is not a valid URL.
#[must_use]
pub fn config_for(server: &MockServer) -> StoreConfig {
    StoreConfig::new(Url::parse(&server.uri()).expect("mock server URI is a URL"))
}

/// A fresh store talking to `server`, with in-memory credentials.
///
/// # Panics
///
/// Panics if the store cannot be built.
#[must_use]
pub fn store_for(server: &MockServer) -> Store {
    init_tracing();
    Store::new(&config_for(server)).expect("store builds")
}

/// Backend JSON for a book.
#[must_use]
pub fn book_json(id: &str, title: &str, price: f64) -> Value {
    json!({
        "_id": id,
        "title": title,
        "description": format!("About {title}"),
        "category": "fiction",
        "trending": false,
        "coverImage": format!("{id}.png"),
        "oldPrice": price + 5.0,
        "newPrice": price,
    })
}

/// Backend JSON for an order.
#[must_use]
pub fn order_json(id: &str, email: &str, product_ids: &[&str], total: f64) -> Value {
    json!({
        "_id": id,
        "name": "Ada Lovelace",
        "email": email,
        "address": {
            "city": "London",
            "country": "UK",
            "state": "Greater London",
            "zipcode": "N1"
        },
        "phone": 1_234_567,
        "productIds": product_ids,
        "totalPrice": total,
        "createdAt": "2024-05-01T10:00:00.000Z",
    })
}
