//! Bookstore Core - Shared domain types.
//!
//! This crate provides the types used by every bookstore component:
//! - `storefront` - HTTP resource client, query cache and session store
//! - `integration-tests` - End-to-end tests against a mock backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no async. Cart mutations and checkout validation live here so
//! they can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and emails
//! - [`book`] - Catalog records and the create/edit payloads
//! - [`order`] - Order records and the order-creation payload
//! - [`cart`] - Cart line items and the snapshotting cart store
//! - [`checkout`] - Checkout form validation and order building

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod book;
pub mod cart;
pub mod checkout;
pub mod order;
pub mod types;

pub use book::{Book, BookUpdate, NewBook};
pub use cart::{AddOutcome, Cart, CartItem, CartStore};
pub use checkout::{CheckoutError, CheckoutField, CheckoutForm, FieldError, build_order};
pub use order::{NewOrder, Order, ShippingAddress};
pub use types::*;
