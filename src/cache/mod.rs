//! Bounded record cache.
//!
//! - [`lru`]: least-recently-used eviction over a per-instance logical clock
//! - [`prefetcher`]: access observers that suggest what to load ahead of demand
//!
//! The [`Cache`] trait is the seam for other eviction policies: a policy only
//! decides which entry leaves when a new key arrives at capacity.

pub mod lru;
pub mod prefetcher;

use serde::Serialize;

use crate::error::Result;

pub use lru::LruCache;
pub use prefetcher::{PrefetchContext, PrefetchHint, Prefetcher, SequentialPrefetcher};

/// Whether an access read or wrote the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccessMode {
    Read,
    Write,
}

/// Running counters for one cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `put` of a key that was not cached.
    pub inserts: u64,
    /// `put` overwriting a cached key.
    pub updates: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of `get` calls that hit (0.0 when there were none).
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

/// Entries as `(key, value, last-access stamp)`.
pub type CacheIter<'a, K, V> = Box<dyn Iterator<Item = (&'a K, &'a V, u64)> + 'a>;

/// A capacity-bounded key/value store with an eviction policy and an
/// optional prefetcher observing every recency-changing access.
pub trait Cache<K, V>: Send {
    /// Returns the cached value and refreshes its recency, or
    /// [`DataError::NotFound`](crate::error::DataError::NotFound).
    fn get(&mut self, key: &K) -> Result<&V>;

    /// Inserts or overwrites `key`. A new key arriving at capacity evicts
    /// one entry first; the evicted pair is returned.
    fn put(&mut self, key: K, value: V) -> Option<(K, V)>;

    /// Membership test. Never changes recency.
    fn contains(&self, key: &K) -> bool;

    /// Drops `key` without write-back. The clock is untouched.
    fn invalidate(&mut self, key: &K) -> Option<V>;

    /// Drops every entry without write-back. The clock is not reset.
    fn invalidate_all(&mut self);

    /// Walks all entries without changing recency.
    fn iter(&self) -> CacheIter<'_, K, V>;

    /// Maximum number of entries.
    fn size(&self) -> usize;

    /// Current number of entries.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// What the configured prefetcher wants loaded next.
    fn prefetch_hint(&mut self) -> PrefetchHint<K>;

    /// Clears the prefetcher's observed history.
    fn reset_prefetcher(&mut self);

    fn stats(&self) -> CacheStats;
}
