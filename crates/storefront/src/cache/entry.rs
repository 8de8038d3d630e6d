//! Cache entry snapshots.
//!
//! An entry is never modified in place; every state change produces a new
//! [`CacheEntry`] that replaces the old one in the cache.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::tag::Tag;
use crate::error::ClientError;

/// Lifecycle of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// A fetch is outstanding.
    Pending,
    /// The last fetch succeeded.
    Fulfilled,
    /// The last fetch failed.
    Rejected,
}

/// State of one cached query.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: QueryStatus,
    /// Last successfully fetched data. Kept across later failures and
    /// refetches.
    pub data: Option<Arc<Value>>,
    /// Error from the last fetch, cleared on success.
    pub error: Option<ClientError>,
    /// Set when a mutation invalidated one of this entry's tags.
    pub stale: bool,
    /// Tags the data provides.
    pub tags: BTreeSet<Tag>,
    /// Generation of the fetch that last wrote this entry.
    pub generation: u64,
    /// When data was last fulfilled.
    pub fulfilled_at: Option<Instant>,
}

impl CacheEntry {
    pub(crate) const fn pending(tags: BTreeSet<Tag>, generation: u64) -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            stale: false,
            tags,
            generation,
            fulfilled_at: None,
        }
    }

    /// Copy of this entry with a new fetch outstanding. Previous data stays.
    pub(crate) fn refetching(&self, tags: BTreeSet<Tag>, generation: u64) -> Self {
        Self {
            status: QueryStatus::Pending,
            tags,
            generation,
            ..self.clone()
        }
    }

    pub(crate) fn fulfilled(&self, data: Arc<Value>) -> Self {
        Self {
            status: QueryStatus::Fulfilled,
            data: Some(data),
            error: None,
            stale: false,
            tags: self.tags.clone(),
            generation: self.generation,
            fulfilled_at: Some(Instant::now()),
        }
    }

    pub(crate) fn rejected(&self, error: ClientError) -> Self {
        Self {
            status: QueryStatus::Rejected,
            error: Some(error),
            stale: false,
            ..self.clone()
        }
    }

    pub(crate) fn invalidated(&self) -> Self {
        Self {
            stale: true,
            ..self.clone()
        }
    }

    /// Data is present, current and safe to return without a fetch.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Fulfilled && !self.stale && self.data.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    /// True when any of `tags` is provided by this entry.
    #[must_use]
    pub fn has_any_tag(&self, tags: &BTreeSet<Tag>) -> bool {
        !self.tags.is_disjoint(tags)
    }

    /// Decode the cached data.
    ///
    /// Returns `None` when nothing has been fetched yet.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Decode` if the data does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<Result<T, ClientError>> {
        self.data
            .as_deref()
            .map(|value| T::deserialize(value).map_err(ClientError::from))
    }
}
