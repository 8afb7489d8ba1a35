//! Caching layers
//!
//! - [`TtlCache`]: in-process time-to-live map shared by the resolver and any
//!   other component that needs short-lived memoization
//! - [`mirror`]: best-effort Redis mirror of the content store snapshot
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wordday::cache::TtlCache;
//! use wordday::utils::SystemClock;
//!
//! let cache = TtlCache::new("answers", Duration::from_secs(3600), Arc::new(SystemClock));
//! cache.set("answer:2024-01-15", "CRANE".to_string());
//! assert_eq!(cache.get("answer:2024-01-15").as_deref(), Some("CRANE"));
//! ```

pub mod mirror;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::utils::Clock;

pub use mirror::{CacheConfig, OptionalMirror, RedisMirror};

/// A cached value with the instant it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Cached value
    pub value: T,
    /// When the value was stored
    pub stored_at: DateTime<Utc>,
    /// Per-entry TTL override (falls back to the cache default)
    pub ttl: Option<Duration>,
}

/// Entry counts computed by a full scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub valid: usize,
}

/// Anything the scheduler can sweep without knowing the value type
pub trait ExpiringCache: Send + Sync {
    /// Name used in logs and status output
    fn name(&self) -> &str;

    /// Remove every expired entry, returning how many were removed
    fn sweep_expired(&self) -> usize;

    /// Current entry counts
    fn stats(&self) -> CacheStats;
}

/// Thread-safe TTL map from string keys to cloned values
///
/// An entry is valid while `now - stored_at < ttl`; at exactly `ttl` it is
/// already expired. Reads never evict, [`TtlCache::sweep_expired`] does.
pub struct TtlCache<T> {
    name: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    /// Create an empty cache with the default TTL for every entry
    pub fn new(name: impl Into<String>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_valid(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
        let ttl = entry.ttl.unwrap_or(self.ttl);
        // A stored_at in the future (clock moved back) counts as age zero
        let age = (now - entry.stored_at).to_std().unwrap_or(Duration::ZERO);
        age < ttl
    }

    /// Get a value if its entry is still valid
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| self.is_valid(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// Get the full entry if still valid
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = self.clock.now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| self.is_valid(entry, now))
            .cloned()
    }

    /// Store a value with the default TTL, replacing any previous entry
    pub fn set(&self, key: impl Into<String>, value: T) {
        self.insert(key.into(), value, None);
    }

    /// Store a value with its own TTL
    pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        self.insert(key.into(), value, Some(ttl));
    }

    fn insert(&self, key: String, value: T, ttl: Option<Duration>) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.lock().insert(key, entry);
    }

    /// Remove an entry, returning whether it existed
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove expired entries
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| self.is_valid(entry, now));
        let removed = before - entries.len();

        if removed > 0 {
            tracing::debug!(cache = %self.name, removed, "Swept expired cache entries");
        }
        removed
    }

    /// Count valid and expired entries
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.lock();
        let valid = entries
            .values()
            .filter(|entry| self.is_valid(entry, now))
            .count();

        CacheStats {
            total: entries.len(),
            expired: entries.len() - valid,
            valid,
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Default TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<T: Clone + Send> ExpiringCache for TtlCache<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn sweep_expired(&self) -> usize {
        TtlCache::sweep_expired(self)
    }

    fn stats(&self) -> CacheStats {
        TtlCache::stats(self)
    }
}
