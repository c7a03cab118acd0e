//! In-process LRU cache with per-entry TTL.
//!
//! Bounded by entry count: once full, the least recently used entry is
//! evicted regardless of its remaining TTL. Expired entries are dropped
//! lazily on read.

use crate::cache::CacheAdapter;
use crate::error::Result;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default cache capacity.
const DEFAULT_CACHE_CAPACITY: usize = 5_000;

/// Default TTL for entries inserted through [`MemoryCache::insert`].
const DEFAULT_TTL_SECONDS: u64 = 3_600;

/// Expiry horizon for TTLs that overflow the clock (about thirty years).
const MAX_TTL: Duration = Duration::from_secs(30 * 365 * 24 * 3_600);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache of verified subjects.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<LruCache<String, Entry>>>,
    stats: Arc<Mutex<CacheStats>>,
    default_ttl: Duration,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including expired entries.
    pub misses: u64,
    /// Number of entries written.
    pub additions: u64,
    /// Number of entries dropped because their TTL ran out.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl MemoryCache {
    /// Create a new cache with default capacity and TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new cache with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_ttl(capacity, DEFAULT_TTL_SECONDS)
    }

    /// Create a new cache with the specified capacity and default TTL.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity_and_ttl(capacity: usize, ttl_seconds: u64) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
            stats: Arc::new(Mutex::new(CacheStats::default())),
            default_ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Look up a live entry, dropping it if expired.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut cache = self.inner.lock();

        let (found, expired) = match cache.get(key) {
            Some(entry) if entry.expires_at > now => (Some(entry.value.clone()), false),
            Some(_) => (None, true),
            None => (None, false),
        };
        if expired {
            cache.pop(key);
            debug!("Cache entry {key} expired");
        }
        drop(cache);

        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        if expired {
            stats.expirations += 1;
        }

        found
    }

    /// Store a value with an explicit TTL.
    pub fn insert_with_ttl(&self, key: &str, ttl: Duration, value: &str) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(MAX_TTL))
            .unwrap_or(now);
        let entry = Entry {
            value: value.to_string(),
            expires_at,
        };
        self.inner.lock().put(key.to_string(), entry);
        self.stats.lock().additions += 1;
    }

    /// Store a value with the cache's default TTL.
    pub fn insert(&self, key: &str, value: &str) {
        self.insert_with_ttl(key, self.default_ttl, value);
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Get the current number of entries, expired ones included until read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheAdapter for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lookup(key))
    }

    async fn set_with_ttl(&self, key: &str, ttl_seconds: u64, value: &str) -> Result<()> {
        self.insert_with_ttl(key, Duration::from_secs(ttl_seconds), value);
        Ok(())
    }
}
