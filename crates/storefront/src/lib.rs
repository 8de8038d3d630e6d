//! Bookstore storefront client.
//!
//! The data layer behind the bookstore frontend:
//! - [`client`] - REST resource client with bearer auth and response
//!   classification
//! - [`cache`] - Query cache with tag-based invalidation and in-flight
//!   de-duplication
//! - [`api`] - Books and orders endpoints declared against the cache
//! - [`store`] - Per-session store owning the cart, APIs and credentials
//! - [`checkout`] - Order confirmation and placement
//!
//! Cart and order types live in `bookstore-core`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod checkout;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod store;

pub use api::{BooksApi, OrdersApi};
pub use cache::{CacheEntry, MutationDescriptor, QueryCache, QueryDescriptor, QueryKey, QueryStatus, Tag};
pub use checkout::{CheckoutFlowError, CheckoutOutcome, Confirm, place_order};
pub use client::ResourceClient;
pub use config::{CacheConfig, ConfigError, StoreConfig};
pub use credentials::{CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::ClientError;
pub use store::{Store, StoreError};
