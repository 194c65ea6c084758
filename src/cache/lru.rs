//! Least-recently-used eviction.
//!
//! Every recency-changing access advances a logical clock owned by the cache
//! instance and stamps the entry with it. A `(stamp, key)` index ordered
//! ascending yields the eviction victim as its first element.
//!
//! Stamps are unique within one instance because the clock only moves
//! forward, so ties cannot occur in practice. The index still orders equal
//! stamps by key, which makes the smaller key the victim of any tie.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug};

use tracing::{debug, trace};

use crate::cache::prefetcher::{PrefetchHint, Prefetcher};
use crate::cache::{AccessMode, Cache, CacheIter, CacheStats};
use crate::error::{DataError, Result};

struct Slot<V> {
    value: V,
    stamp: u64,
}

/// LRU cache keyed by any ordered key.
pub struct LruCache<K, V> {
    entries: BTreeMap<K, Slot<V>>,
    recency: BTreeSet<(u64, K)>,
    capacity: usize,
    clock: u64,
    prefetcher: Option<Box<dyn Prefetcher<K>>>,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Ord + Clone + Debug,
{
    /// Empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DataError::invalid("cache capacity must be at least 1"));
        }
        Ok(Self {
            entries: BTreeMap::new(),
            recency: BTreeSet::new(),
            capacity,
            clock: 0,
            prefetcher: None,
            stats: CacheStats::default(),
        })
    }

    pub fn with_prefetcher<P>(capacity: usize, prefetcher: P) -> Result<Self>
    where
        P: Prefetcher<K> + 'static,
    {
        let mut cache = Self::new(capacity)?;
        cache.set_prefetcher(prefetcher);
        Ok(cache)
    }

    pub fn set_prefetcher<P>(&mut self, prefetcher: P)
    where
        P: Prefetcher<K> + 'static,
    {
        self.prefetcher = Some(Box::new(prefetcher));
    }

    pub fn has_prefetcher(&self) -> bool {
        self.prefetcher.is_some()
    }

    /// Current value of the logical clock.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Last-access stamp of `key`, without touching it.
    pub fn stamp(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|slot| slot.stamp)
    }

    /// The entry the next eviction would remove.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let (_, key) = self.recency.first()?;
        self.entries.get_key_value(key).map(|(k, slot)| (k, &slot.value))
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        let (stamp, key) = self.recency.pop_first()?;
        let slot = self.entries.remove(&key)?;
        self.stats.evictions += 1;
        debug!(key = ?key, stamp, "Evicted least recently used entry");
        Some((key, slot.value))
    }

    fn notify(&mut self, key: &K, mode: AccessMode) {
        if let Some(prefetcher) = self.prefetcher.as_mut() {
            prefetcher.observe(key, mode);
        }
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Ord + Clone + Debug + Send,
    V: Send,
{
    fn get(&mut self, key: &K) -> Result<&V> {
        let Some(slot) = self.entries.get_mut(key) else {
            self.stats.misses += 1;
            trace!(key = ?key, "Cache miss");
            return Err(DataError::not_found(key));
        };

        self.clock += 1;
        let previous = std::mem::replace(&mut slot.stamp, self.clock);
        self.recency.remove(&(previous, key.clone()));
        self.recency.insert((self.clock, key.clone()));
        self.stats.hits += 1;
        trace!(key = ?key, stamp = self.clock, "Cache hit");

        if let Some(prefetcher) = self.prefetcher.as_mut() {
            prefetcher.observe(key, AccessMode::Read);
        }
        Ok(&slot.value)
    }

    fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        let evicted = if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        self.clock += 1;
        let now = self.clock;
        match self.entries.get_mut(&key) {
            Some(slot) => {
                let previous = std::mem::replace(&mut slot.stamp, now);
                slot.value = value;
                self.recency.remove(&(previous, key.clone()));
                self.stats.updates += 1;
            }
            None => {
                self.entries.insert(key.clone(), Slot { value, stamp: now });
                self.stats.inserts += 1;
            }
        }
        self.recency.insert((now, key.clone()));
        trace!(key = ?key, stamp = now, "Cache put");

        self.notify(&key, AccessMode::Write);
        evicted
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn invalidate(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&(slot.stamp, key.clone()));
        self.stats.invalidations += 1;
        Some(slot.value)
    }

    fn invalidate_all(&mut self) {
        self.stats.invalidations += self.entries.len() as u64;
        self.entries.clear();
        self.recency.clear();
    }

    fn iter(&self) -> CacheIter<'_, K, V> {
        Box::new(
            self.entries
                .iter()
                .map(|(key, slot)| (key, &slot.value, slot.stamp)),
        )
    }

    fn size(&self) -> usize {
        self.capacity
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn prefetch_hint(&mut self) -> PrefetchHint<K> {
        match self.prefetcher.as_mut() {
            Some(prefetcher) => prefetcher.suggest(),
            None => PrefetchHint::Nothing,
        }
    }

    fn reset_prefetcher(&mut self) {
        if let Some(prefetcher) = self.prefetcher.as_mut() {
            prefetcher.reset();
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl<K: Debug, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("count", &self.entries.len())
            .field("clock", &self.clock)
            .field("prefetcher", &self.prefetcher.is_some())
            .finish()
    }
}
