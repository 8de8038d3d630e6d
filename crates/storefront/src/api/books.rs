//! Catalog API: `/api/v1/books`.

use std::sync::Arc;

use bookstore_core::{Book, BookId, BookUpdate, NewBook};
use reqwest::Method;
use serde_json::Value;
use tracing::instrument;

use super::{BOOKS, decode, segment};
use crate::cache::{CacheEntry, MutationDescriptor, QueryCache, QueryDescriptor, QueryKey, Tag};
use crate::client::ResourceClient;
use crate::error::ClientError;

/// Books resource with cached reads.
#[derive(Debug, Clone)]
pub struct BooksApi {
    client: ResourceClient,
    cache: QueryCache,
}

impl BooksApi {
    #[must_use]
    pub const fn new(client: ResourceClient, cache: QueryCache) -> Self {
        Self { client, cache }
    }

    /// The cache backing this API.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // =========================================================================
    // Descriptors
    // =========================================================================

    /// `fetchAllBooks`, providing `Books`.
    #[must_use]
    pub fn all_books_query() -> QueryDescriptor {
        QueryDescriptor::new(QueryKey::unit("fetchAllBooks"), [Tag::kind(BOOKS)])
    }

    /// `fetchBookById`, providing `Books` and `Books:<id>`.
    #[must_use]
    pub fn book_query(id: &BookId) -> QueryDescriptor {
        QueryDescriptor::new(
            QueryKey::new("fetchBookById", id.as_str()),
            [Tag::kind(BOOKS), Tag::with_id(BOOKS, id.as_str())],
        )
    }

    fn write(name: &'static str) -> MutationDescriptor {
        MutationDescriptor::new(name, [Tag::kind(BOOKS)])
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every book in the catalog.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the fetch fails or the body is not a list
    /// of books.
    #[instrument(skip(self))]
    pub async fn fetch_all_books(&self) -> Result<Vec<Book>, ClientError> {
        let client = self.client.clone();
        let value = self
            .cache
            .query(&Self::all_books_query(), move || async move { client.get("/").await })
            .await?;
        decode(&value)
    }

    /// Current cache state of the catalog listing, starting a background
    /// fetch if it is missing or stale.
    #[must_use]
    pub fn all_books_state(&self) -> Arc<CacheEntry> {
        let client = self.client.clone();
        self.cache
            .query_state(&Self::all_books_query(), move || async move { client.get("/").await })
    }

    /// Fetch the catalog even if the cached listing is fresh.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_all_books`].
    pub async fn refresh_all_books(&self) -> Result<Vec<Book>, ClientError> {
        let client = self.client.clone();
        let value = self
            .cache
            .refetch(&Self::all_books_query(), move || async move { client.get("/").await })
            .await?;
        decode(&value)
    }

    /// A single book.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` with status 404 for an unknown id.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn fetch_book_by_id(&self, id: &BookId) -> Result<Book, ClientError> {
        let client = self.client.clone();
        let path = segment(id.as_str());
        let value = self
            .cache
            .query(&Self::book_query(id), move || async move { client.get(&path).await })
            .await?;
        decode(&value)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a book. Returns the backend's response body.
    ///
    /// # Errors
    ///
    /// Returns the request's `ClientError`; the cache is untouched on failure.
    #[instrument(skip(self, book), fields(title = %book.title))]
    pub async fn add_book(&self, book: &NewBook) -> Result<Value, ClientError> {
        self.cache
            .mutate(&Self::write("addBook"), || {
                self.client.request(Method::POST, "/create-book", Some(book))
            })
            .await
    }

    /// Apply a partial update to a book.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidRequest` for an empty update, otherwise
    /// the request's `ClientError`.
    #[instrument(skip(self, update), fields(id = %id))]
    pub async fn update_book(&self, id: &BookId, update: &BookUpdate) -> Result<Value, ClientError> {
        if update.is_empty() {
            return Err(ClientError::InvalidRequest("update has no fields set".to_string()));
        }
        let path = format!("/edit/{}", segment(id.as_str()));
        self.cache
            .mutate(&Self::write("updateBook"), || {
                self.client.request(Method::PUT, &path, Some(update))
            })
            .await
    }

    /// Delete a book.
    ///
    /// # Errors
    ///
    /// Returns the request's `ClientError`; the cache is untouched on failure.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_book(&self, id: &BookId) -> Result<Value, ClientError> {
        let path = segment(id.as_str());
        self.cache
            .mutate(&Self::write("deleteBook"), || {
                self.client.request::<()>(Method::DELETE, &path, None)
            })
            .await
    }
}
