//! Query cache with tag-based invalidation.
//!
//! # Model
//!
//! - Reads are identified by a [`QueryKey`] and provide a set of [`Tag`]s.
//! - Writes declare the tags they invalidate. After a successful write,
//!   every entry providing one of those tags is marked stale, and its next
//!   read fetches again.
//! - At most one fetch is outstanding per key. Concurrent readers share it.
//! - Each fetch takes a new generation number. A fetch that has been
//!   superseded (by invalidation, a forced refetch, or removal) never writes
//!   the cache.
//! - A failed fetch marks the entry `Rejected` and keeps the previous data.
//!
//! Entries live in a `moka` cache bounded by capacity and idle time. The
//! tag index and in-flight fetches live next to it behind a single mutex.
//! The mutex is never held across an `.await`, so every state transition is
//! atomic. Keys evicted by `moka` are queued by its eviction listener and
//! dropped from the tag index the next time the mutex is taken.

mod entry;
mod tag;

pub use entry::{CacheEntry, QueryStatus};
pub use tag::{MutationDescriptor, QueryDescriptor, QueryKey, Tag};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use moka::notification::RemovalCause;
use moka::sync::Cache;
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::config::CacheConfig;
use crate::error::ClientError;

/// Result shared between every caller waiting on one fetch.
pub type FetchResult = Result<Arc<Value>, ClientError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Keys `moka` evicted, with the tags their entries provided.
type EvictionQueue = Arc<Mutex<Vec<(QueryKey, BTreeSet<Tag>)>>>;

/// Tag-invalidated cache for one API.
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<QueryCacheInner>,
}

struct QueryCacheInner {
    name: &'static str,
    entries: Cache<QueryKey, Arc<CacheEntry>>,
    book: Mutex<Bookkeeping>,
    evicted: EvictionQueue,
}

#[derive(Default)]
struct Bookkeeping {
    /// Tag -> keys whose entries provide it
    tag_index: HashMap<Tag, HashSet<QueryKey>>,
    /// Last generation issued by this cache
    generation: u64,
    /// The current fetch per key. Replacing or removing one supersedes it.
    in_flight: HashMap<QueryKey, InFlight>,
}

struct InFlight {
    generation: u64,
    future: SharedFetch,
}

impl Bookkeeping {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn is_current(&self, key: &QueryKey, generation: u64) -> bool {
        self.in_flight
            .get(key)
            .is_some_and(|in_flight| in_flight.generation == generation)
    }

    fn index_tags(&mut self, key: &QueryKey, previous: Option<&BTreeSet<Tag>>, tags: &BTreeSet<Tag>) {
        if let Some(previous) = previous {
            self.unindex_tags(previous.difference(tags), key);
        }
        for tag in tags {
            self.tag_index.entry(tag.clone()).or_default().insert(key.clone());
        }
    }

    fn unindex_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a Tag>, key: &QueryKey) {
        for tag in tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
    }
}

impl QueryCacheInner {
    /// Lock the bookkeeping, first forgetting keys `moka` has evicted.
    ///
    /// Keys with a fetch outstanding stay indexed: the fetch re-inserts the
    /// entry, and an invalidation must still be able to supersede it.
    fn book(&self) -> MutexGuard<'_, Bookkeeping> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let evicted = std::mem::take(&mut *self.evicted.lock().unwrap_or_else(PoisonError::into_inner));
        for (key, tags) in evicted {
            if book.in_flight.contains_key(&key) || self.entries.contains_key(&key) {
                continue;
            }
            book.unindex_tags(&tags, &key);
        }
        book
    }
}

/// What [`QueryCache::begin`] decided.
enum Begin {
    Fresh(Arc<CacheEntry>),
    Fetching(Arc<CacheEntry>, SharedFetch),
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("name", &self.inner.name)
            .field("entries", &self.inner.entries.entry_count())
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    /// Create an empty cache. `name` identifies it in logs.
    #[must_use]
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        let evicted = EvictionQueue::default();
        let queue = Arc::clone(&evicted);
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_idle(config.idle_timeout)
            .eviction_listener(move |key: Arc<QueryKey>, entry: Arc<CacheEntry>, cause: RemovalCause| {
                // Explicit removals and replacements are handled under the bookkeeping lock.
                if cause.was_evicted() {
                    queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((QueryKey::clone(&key), entry.tags.clone()));
                }
            })
            .build();

        Self {
            inner: Arc::new(QueryCacheInner {
                name,
                entries,
                book: Mutex::new(Bookkeeping::default()),
                evicted,
            }),
        }
    }

    fn book(&self) -> MutexGuard<'_, Bookkeeping> {
        self.inner.book()
    }

    /// Current entry for `key`, without fetching.
    #[must_use]
    pub fn peek(&self, key: &QueryKey) -> Option<Arc<CacheEntry>> {
        self.inner.entries.get(key)
    }

    /// Read through the cache.
    ///
    /// Returns the cached data when fresh. Otherwise waits for a fetch,
    /// joining one that is already outstanding for the same key.
    ///
    /// `fetch` is called when the fetch is first polled, never while the
    /// cache is locked, so it may itself use the cache.
    ///
    /// Dropping every waiting caller before the fetch resolves stops it from
    /// being polled. It writes nothing unless a later caller joins it.
    ///
    /// # Errors
    ///
    /// Returns the fetch's `ClientError`; it is also recorded on the entry.
    pub async fn query<F, Fut>(&self, descriptor: &QueryDescriptor, fetch: F) -> FetchResult
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        match self.begin(descriptor, fetch, false) {
            Begin::Fresh(entry) => entry
                .data
                .clone()
                .ok_or_else(|| ClientError::Decode("fresh entry without data".to_string())),
            Begin::Fetching(_, future) => future.await,
        }
    }

    /// Read through the cache without waiting.
    ///
    /// Returns the current entry immediately. If a fetch was needed, it is
    /// spawned onto the Tokio runtime and the returned entry is `Pending`,
    /// still holding any previous data.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn query_state<F, Fut>(&self, descriptor: &QueryDescriptor, fetch: F) -> Arc<CacheEntry>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        match self.begin(descriptor, fetch, false) {
            Begin::Fresh(entry) => entry,
            Begin::Fetching(entry, future) => {
                tokio::spawn(future);
                entry
            }
        }
    }

    /// Fetch again even if the cached data is fresh.
    ///
    /// Any outstanding fetch for the key is superseded; its result will not
    /// be written.
    ///
    /// # Errors
    ///
    /// Returns the fetch's `ClientError`; it is also recorded on the entry.
    pub async fn refetch<F, Fut>(&self, descriptor: &QueryDescriptor, fetch: F) -> FetchResult
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        match self.begin(descriptor, fetch, true) {
            Begin::Fresh(entry) => entry
                .data
                .clone()
                .ok_or_else(|| ClientError::Decode("fresh entry without data".to_string())),
            Begin::Fetching(_, future) => future.await,
        }
    }

    /// Run a write and, on success, invalidate the tags it declares.
    ///
    /// On failure the cache is left untouched and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns whatever error `run` produced.
    #[instrument(skip(self, run), fields(cache = self.inner.name, mutation = %descriptor.name))]
    pub async fn mutate<T, F, Fut>(&self, descriptor: &MutationDescriptor, run: F) -> Result<T, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        match run().await {
            Ok(value) => {
                let invalidated = self.invalidate_tags(&descriptor.invalidates);
                debug!(invalidated, "Mutation succeeded");
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "Mutation failed, cache untouched");
                Err(err)
            }
        }
    }

    /// Mark every entry providing any of `tags` stale.
    ///
    /// Outstanding fetches for those keys are superseded, including ones
    /// whose pending entry has already been evicted. Returns the number of
    /// keys invalidated.
    pub fn invalidate_tags(&self, tags: &BTreeSet<Tag>) -> usize {
        let mut book = self.book();

        let keys: BTreeSet<QueryKey> = tags
            .iter()
            .filter_map(|tag| book.tag_index.get(tag))
            .flat_map(|keys| keys.iter().cloned())
            .collect();

        let mut invalidated = 0;
        for key in &keys {
            let superseded = book.in_flight.remove(key).is_some();
            if superseded {
                trace!(cache = self.inner.name, %key, "Superseded in-flight fetch");
            }

            match self.inner.entries.get(key) {
                Some(entry) => {
                    self.inner.entries.insert(key.clone(), Arc::new(entry.invalidated()));
                    invalidated += 1;
                }
                None => {
                    // Evicted: nothing left to mark, and nothing left to index.
                    book.unindex_tags(tags, key);
                    if superseded {
                        invalidated += 1;
                    }
                }
            }
        }
        drop(book);

        debug!(
            cache = self.inner.name,
            tags = ?tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            invalidated,
            "Invalidated tags"
        );
        invalidated
    }

    /// Drop the entry for `key`, superseding any outstanding fetch.
    pub fn remove(&self, key: &QueryKey) {
        let mut book = self.book();
        if let Some(entry) = self.inner.entries.remove(key) {
            book.unindex_tags(&entry.tags, key);
        }
        book.in_flight.remove(key);
    }

    /// Drop every entry and supersede every outstanding fetch.
    pub fn reset(&self) {
        let mut book = self.book();
        book.in_flight.clear();
        book.tag_index.clear();
        self.inner.entries.invalidate_all();
        debug!(cache = self.inner.name, "Cache reset");
    }

    /// Run pending expiry and eviction now and forget evicted keys.
    ///
    /// `moka` otherwise does this work lazily during reads and writes.
    pub fn run_pending_tasks(&self) {
        self.inner.entries.run_pending_tasks();
        drop(self.book());
    }

    /// Number of keys with an outstanding fetch.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.book().in_flight.len()
    }

    /// Decide between returning cached data, joining an outstanding fetch,
    /// or starting a new one. Runs entirely under the bookkeeping lock;
    /// `fetch` itself only runs once the returned future is polled.
    fn begin<F, Fut>(&self, descriptor: &QueryDescriptor, fetch: F, force: bool) -> Begin
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        let key = &descriptor.key;
        let mut book = self.book();
        let existing = self.inner.entries.get(key);

        if !force {
            if let Some(entry) = existing.as_ref().filter(|entry| entry.is_fresh()) {
                trace!(cache = self.inner.name, %key, "Cache hit");
                return Begin::Fresh(Arc::clone(entry));
            }
            if let Some(in_flight) = book.in_flight.get(key) {
                trace!(cache = self.inner.name, %key, generation = in_flight.generation, "Joining in-flight fetch");
                let entry = existing.unwrap_or_else(|| {
                    Arc::new(CacheEntry::pending(descriptor.provides.clone(), in_flight.generation))
                });
                return Begin::Fetching(entry, in_flight.future.clone());
            }
        }

        let generation = book.next_generation();
        let entry = Arc::new(existing.as_ref().map_or_else(
            || CacheEntry::pending(descriptor.provides.clone(), generation),
            |previous| previous.refetching(descriptor.provides.clone(), generation),
        ));
        book.index_tags(key, existing.as_ref().map(|e| &e.tags), &descriptor.provides);
        self.inner.entries.insert(key.clone(), Arc::clone(&entry));

        debug!(cache = self.inner.name, %key, generation, "Starting fetch");
        let future = Self::complete(
            Arc::clone(&self.inner),
            key.clone(),
            descriptor.provides.clone(),
            generation,
            fetch,
        )
        .boxed()
        .shared();
        // Replacing an older fetch supersedes it.
        book.in_flight.insert(
            key.clone(),
            InFlight {
                generation,
                future: future.clone(),
            },
        );

        Begin::Fetching(entry, future)
    }

    /// Run a fetch and record its outcome if it is still current.
    async fn complete<F, Fut>(
        inner: Arc<QueryCacheInner>,
        key: QueryKey,
        tags: BTreeSet<Tag>,
        generation: u64,
        fetch: F,
    ) -> FetchResult
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, ClientError>> + Send + 'static,
    {
        let outcome = fetch().await.map(Arc::new);

        let mut book = inner.book();
        if !book.is_current(&key, generation) {
            debug!(cache = inner.name, %key, generation, "Discarding superseded fetch result");
            return outcome;
        }
        book.in_flight.remove(&key);

        // The pending entry may have been evicted while the fetch ran.
        let base = inner
            .entries
            .get(&key)
            .unwrap_or_else(|| Arc::new(CacheEntry::pending(tags.clone(), generation)));
        book.index_tags(&key, None, &tags);

        let entry = match &outcome {
            Ok(data) => base.fulfilled(Arc::clone(data)),
            Err(err) => {
                warn!(cache = inner.name, %key, error = %err, "Query failed");
                base.rejected(err.clone())
            }
        };
        inner.entries.insert(key, Arc::new(entry));
        drop(book);

        outcome
    }
}
