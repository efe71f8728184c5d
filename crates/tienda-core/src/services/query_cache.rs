//! Keyed query cache
//!
//! Maps a serialized query key to the latest state of that query
//! (pending / ready / failed) plus the time it settled. Each entry owns a
//! `watch` channel, so any number of subscribers see the same result.
//!
//! # Behavior
//!
//! - A ready entry is returned as-is (cache hit), unless it is older than
//!   the optional staleness window.
//! - While a fetch for a key is in flight, further requests for that key
//!   subscribe to it instead of issuing their own.
//! - A failed entry is not reused: the next request fetches again.
//! - Fetches run on a spawned task, so they settle even if the caller that
//!   started them is dropped.
//! - Entries live until explicitly invalidated.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{Error, Result};

// ============================================================================
// Key / State
// ============================================================================

/// Canonical identity of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observable state of one query
#[derive(Debug)]
pub enum QueryState<T> {
    /// No data yet
    Pending,
    Ready(Arc<T>),
    Failed(Error),
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            QueryState::Pending => QueryState::Pending,
            QueryState::Ready(data) => QueryState::Ready(Arc::clone(data)),
            QueryState::Failed(err) => QueryState::Failed(err.clone()),
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, QueryState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, QueryState::Failed(_))
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            QueryState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Settled state as a `Result`; pending counts as cancelled
    pub fn into_result(self) -> Result<Arc<T>> {
        match self {
            QueryState::Ready(data) => Ok(data),
            QueryState::Failed(err) => Err(err),
            QueryState::Pending => Err(Error::Cancelled("query has not settled".to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueryState::Pending => "pending",
            QueryState::Ready(_) => "ready",
            QueryState::Failed(_) => "failed",
        }
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Served from a ready entry
    pub hits: u64,
    /// Started a new fetch
    pub misses: u64,
    /// Joined a fetch already in flight
    pub shared: u64,
}

// ============================================================================
// QueryCache
// ============================================================================

struct Entry<T> {
    tx: Arc<watch::Sender<QueryState<T>>>,
    in_flight: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> Entry<T> {
    fn new() -> Self {
        let (tx, _) = watch::channel(QueryState::Pending);
        Self {
            tx: Arc::new(tx),
            in_flight: false,
            updated_at: None,
        }
    }
}

type Entries<T> = Mutex<HashMap<QueryKey, Entry<T>>>;

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    shared: AtomicU64,
}

/// Keyed cache with in-flight sharing and subscriber notification
///
/// Cheap to clone; clones share entries.
pub struct QueryCache<T> {
    entries: Arc<Entries<T>>,
    counters: Arc<Counters>,
    stale_after: Option<Duration>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            counters: Arc::clone(&self.counters),
            stale_after: self.stale_after,
        }
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(entries: &Entries<T>) -> MutexGuard<'_, HashMap<QueryKey, Entry<T>>> {
    // No invariant spans a panic inside the critical sections below
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> QueryCache<T> {
    /// Cache that keeps ready entries for the whole session
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
            stale_after: None,
        }
    }

    /// Cache whose ready entries refetch once older than `stale_after`
    pub fn with_stale_after(stale_after: Option<Duration>) -> Self {
        Self {
            stale_after,
            ..Self::new()
        }
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after
    }

    /// Current state of a key without fetching
    pub fn peek(&self, key: &QueryKey) -> Option<QueryState<T>> {
        lock(&self.entries)
            .get(key)
            .map(|entry| entry.tx.borrow().clone())
    }

    /// When the key last settled
    pub fn updated_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        lock(&self.entries).get(key).and_then(|e| e.updated_at)
    }

    /// Whether a fetch for the key is running
    pub fn is_in_flight(&self, key: &QueryKey) -> bool {
        lock(&self.entries).get(key).is_some_and(|e| e.in_flight)
    }

    /// Receiver for the key's state; creates a pending entry if absent
    pub fn subscribe(&self, key: &QueryKey) -> watch::Receiver<QueryState<T>> {
        let mut entries = lock(&self.entries);
        entries
            .entry(key.clone())
            .or_insert_with(Entry::new)
            .tx
            .subscribe()
    }

    /// Drop one entry; the next request refetches
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let removed = lock(&self.entries).remove(key).is_some();
        if removed {
            log::debug!("[reports:cache] Invalidated {}", key);
        }
        removed
    }

    /// Drop every entry whose key matches
    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("[reports:cache] Invalidated {} entries", removed);
        }
        removed
    }

    /// Drop everything
    pub fn clear(&self) -> usize {
        let mut entries = lock(&self.entries);
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            shared: self.counters.shared.load(Ordering::Relaxed),
        }
    }

    fn is_stale(&self, entry: &Entry<T>) -> bool {
        match (self.stale_after, entry.updated_at) {
            (Some(window), Some(updated_at)) => {
                let age = Utc::now().signed_duration_since(updated_at);
                age.to_std().map(|age| age >= window).unwrap_or(false)
            }
            _ => false,
        }
    }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    /// Resolve a key: serve a ready entry, join an in-flight fetch, or
    /// start a new one with `fetcher`
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let rx = self.start(key, fetcher);
        settle(rx).await
    }

    /// Like [`fetch`](Self::fetch) but returns the receiver immediately
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&self, key: QueryKey, fetcher: F) -> watch::Receiver<QueryState<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut entries = lock(&self.entries);
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);

        if entry.in_flight {
            self.counters.shared.fetch_add(1, Ordering::Relaxed);
            log::debug!("[reports:cache] Joining in-flight fetch for {}", key);
            return entry.tx.subscribe();
        }

        if entry.tx.borrow().is_ready() && !self.is_stale(entry) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("[reports:cache] Hit {}", key);
            return entry.tx.subscribe();
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("[reports:cache] Miss {}, fetching", key);

        entry.in_flight = true;
        if !entry.tx.borrow().is_pending() {
            entry.tx.send_replace(QueryState::Pending);
        }
        let rx = entry.tx.subscribe();
        let tx = Arc::clone(&entry.tx);
        drop(entries);

        let shared = Arc::clone(&self.entries);
        let task = fetcher();
        tokio::spawn(async move {
            let state = match tokio::spawn(task).await {
                Ok(Ok(data)) => QueryState::Ready(Arc::new(data)),
                Ok(Err(err)) => QueryState::Failed(err),
                Err(join_err) => {
                    QueryState::Failed(Error::Cancelled(format!("fetch task failed: {}", join_err)))
                }
            };

            // Publish under the lock so no caller sees "not in flight" with
            // a pending state
            let mut entries = lock(&shared);
            match entries.get_mut(&key) {
                Some(entry) if Arc::ptr_eq(&entry.tx, &tx) => {
                    entry.in_flight = false;
                    entry.updated_at = Some(Utc::now());
                }
                _ => {
                    log::debug!(
                        "[reports:cache] {} was invalidated mid-flight, result not cached",
                        key
                    );
                }
            }
            tx.send_replace(state);
        });

        rx
    }
}

/// Wait until a receiver's query is no longer pending
pub async fn settle<T>(mut rx: watch::Receiver<QueryState<T>>) -> QueryState<T> {
    match rx.wait_for(|state| !state.is_pending()).await {
        Ok(state) => state.clone(),
        Err(_) => QueryState::Failed(Error::Cancelled(
            "query was invalidated before it settled".to_string(),
        )),
    }
}
