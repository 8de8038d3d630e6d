//! Per-session store.
//!
//! A [`Store`] owns everything one browsing session needs: the cart, the
//! books and orders APIs with their caches, and the credential store that
//! supplies the bearer token. It is built once and passed by reference.

use std::sync::Arc;

use bookstore_core::{AddOutcome, Book, Cart, CartStore};
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{BooksApi, OrdersApi};
use crate::cache::QueryCache;
use crate::client::{ResourceClient, build_http_client};
use crate::config::StoreConfig;
use crate::credentials::{
    CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore, TOKEN_KEY,
};
use crate::error::ClientError;

/// Errors from building a [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Session state: cart, cached APIs and credentials.
pub struct Store {
    cart: CartStore,
    books: BooksApi,
    orders: OrdersApi,
    credentials: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("cart_items", &self.cart.len())
            .field("books", &self.books)
            .field("orders", &self.orders)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Build a store from configuration.
    ///
    /// Credentials are kept in the file named by `credentials_file` when set,
    /// in memory otherwise. A configured token is written to the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the HTTP client cannot be built or the
    /// credential file cannot be read.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let credentials: Arc<dyn CredentialStore> = match &config.credentials_file {
            Some(path) => Arc::new(FileCredentialStore::open(path)?),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Self::with_credentials(config, credentials)
    }

    /// Build a store around an existing credential store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the HTTP client cannot be built or a
    /// configured token cannot be saved.
    pub fn with_credentials(
        config: &StoreConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, StoreError> {
        if let Some(token) = &config.token {
            credentials.set(TOKEN_KEY, token.clone())?;
        }

        let http = build_http_client(config)?;
        let books = BooksApi::new(
            ResourceClient::new(http.clone(), config, "books", Arc::clone(&credentials)),
            QueryCache::new("books", config.cache),
        );
        let orders = OrdersApi::new(
            ResourceClient::new(http, config, "orders", Arc::clone(&credentials)),
            QueryCache::new("orders", config.cache),
        );

        info!(base_url = %config.base_url, "Store ready");

        Ok(Self {
            cart: CartStore::new(),
            books,
            orders,
            credentials,
        })
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn books(&self) -> &BooksApi {
        &self.books
    }

    #[must_use]
    pub const fn orders(&self) -> &OrdersApi {
        &self.orders
    }

    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    /// Put one copy of `book` in the cart at its current price.
    pub fn add_to_cart(&self, book: &Book) -> (Arc<Cart>, AddOutcome) {
        let (cart, outcome) = self.cart.add(book.to_cart_item());
        debug!(book_id = %book.id, ?outcome, items = cart.len(), "Added to cart");
        (cart, outcome)
    }

    /// Whether a bearer token is stored.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.credentials.token().is_some()
    }

    /// Store a bearer token. Cached orders belong to the previous identity
    /// and are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` if a persistent store fails to write.
    pub fn sign_in(&self, token: SecretString) -> Result<(), CredentialError> {
        self.credentials.set(TOKEN_KEY, token)?;
        self.orders.cache().reset();
        info!("Signed in");
        Ok(())
    }

    /// Forget the bearer token and drop cached orders.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` if a persistent store fails to write.
    pub fn sign_out(&self) -> Result<(), CredentialError> {
        self.credentials.remove(TOKEN_KEY)?;
        self.orders.cache().reset();
        info!("Signed out");
        Ok(())
    }
}
