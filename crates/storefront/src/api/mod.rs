//! Typed resource APIs.
//!
//! Each API pairs a [`ResourceClient`](crate::client::ResourceClient) with
//! its own [`QueryCache`](crate::cache::QueryCache) and declares, per
//! operation, which tags a read provides and which tags a write invalidates.

mod books;
mod orders;

pub use books::BooksApi;
pub use orders::OrdersApi;

use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Tag type for catalog reads and writes.
pub const BOOKS: &str = "Books";

/// Tag type for order reads and writes.
pub const ORDERS: &str = "Orders";

/// Percent-encode a path segment.
fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Decode shared cache data into an owned value.
fn decode<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, ClientError> {
    T::deserialize(value).map_err(ClientError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("abc123"), "abc123");
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
        assert_eq!(segment("reader+1@example.com"), "reader%2B1%40example.com");
    }
}
