//! In-memory get-or-compute cache with per-entry expiry and tags.
//!
//! Population is single-flight per key: while one caller is computing a
//! value, other callers for the same key wait and then read what it stored.
//! Failed computations store nothing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

/// Time source for expiry checks.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to exercise expiry in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
    tags: Vec<String>,
}

/// Keyed TTL cache with tag-based invalidation.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    inflight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Return the value for `key` if present and not expired.
    ///
    /// Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// Expired entries under other keys are dropped at the same time, so the
    /// map never holds more than the live entries plus the new one.
    pub fn insert(&self, key: &str, value: V, ttl: Duration, tags: &[&str]) {
        let now = self.clock.now();
        let entry = Entry {
            value,
            expires_at: now + ttl,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        };

        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(purged, "dropped expired cache entries");
        }
        entries.insert(key.to_string(), entry);
    }

    /// Return the cached value for `key`, or run `compute` and cache its
    /// result for `ttl`.
    ///
    /// At most one `compute` runs per key at a time. An `Err` from `compute`
    /// is returned as-is and nothing is cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        tags: &[&str],
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        let lock = self.key_lock(key);
        let guard = lock.lock().await;

        // Another caller may have populated the entry while we waited.
        if let Some(value) = self.get(key) {
            tracing::debug!(key, "cache hit after waiting on in-flight computation");
            drop(guard);
            self.release_key_lock(key, lock);
            return Ok(value);
        }

        tracing::debug!(key, "cache miss, computing");
        let result = compute().await;
        if let Ok(value) = &result {
            self.insert(key, value.clone(), ttl, tags);
        }

        drop(guard);
        self.release_key_lock(key, lock);
        result
    }

    /// Remove a single entry. Returns true if something was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every entry tagged with any of `tags`. Returns how many were removed.
    pub fn invalidate_tags(&self, tags: &[&str]) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|t| tags.contains(&t.as_str())));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(?tags, removed, "invalidated tagged cache entries");
        }
        removed
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        self.inflight
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn release_key_lock(&self, key: &str, lock: Arc<AsyncMutex<()>>) {
        let mut inflight = self.inflight.lock();
        drop(lock);
        // Only the map still holds it: nobody else is waiting.
        if inflight.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            inflight.remove(key);
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
