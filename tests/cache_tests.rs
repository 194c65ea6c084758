//! Integration tests for the LRU cache and its prefetch hook.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use datasource_cache::cache::{AccessMode, Cache, LruCache, PrefetchHint, Prefetcher};

/// Records every observation so tests can inspect the hook traffic.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<(u32, AccessMode)>>>,
}

impl Prefetcher<u32> for Recorder {
    fn observe(&mut self, key: &u32, mode: AccessMode) {
        self.events.lock().unwrap().push((*key, mode));
    }

    fn suggest(&mut self) -> PrefetchHint<u32> {
        let events = self.events.lock().unwrap();
        match events.last() {
            Some((key, _)) => PrefetchHint::Keys(vec![key + 1]),
            None => PrefetchHint::Nothing,
        }
    }

    fn reset(&mut self) {
        self.events.lock().unwrap().clear();
    }
}

#[test]
fn test_lru_evicts_least_recently_touched() {
    let mut cache = LruCache::new(3).unwrap();
    cache.put("a", 1);
    cache.put("b", 2);
    cache.put("c", 3);
    cache.get(&"a").unwrap();

    let evicted = cache.put("d", 4);

    assert_eq!(evicted, Some(("b", 2)));
    let remaining: Vec<_> = cache.iter().map(|(k, v, _)| (*k, *v)).collect();
    assert_eq!(remaining, vec![("a", 1), ("c", 3), ("d", 4)]);
}

#[test]
fn test_recency_refresh_and_pure_contains() {
    let mut cache = LruCache::new(4).unwrap();
    cache.put(1u32, "one");
    cache.put(2, "two");
    cache.put(3, "three");

    cache.get(&1).unwrap();
    assert_eq!(cache.stamp(&1), Some(cache.clock()));

    cache.put(2, "TWO");
    assert_eq!(cache.stamp(&2), Some(cache.clock()));

    let before = (cache.clock(), cache.stamp(&3));
    assert!(cache.contains(&3));
    assert!(!cache.contains(&9));
    assert_eq!((cache.clock(), cache.stamp(&3)), before);
}

#[test]
fn test_iteration_does_not_touch_recency() {
    let mut cache = LruCache::new(2).unwrap();
    cache.put("x", 1);
    cache.put("y", 2);

    let seen: Vec<_> = cache.iter().map(|(k, v, stamp)| (*k, *v, stamp)).collect();
    assert_eq!(seen, vec![("x", 1, 1), ("y", 2, 2)]);

    cache.put("z", 3);
    assert!(!cache.contains(&"x"));
    assert!(cache.contains(&"y"));
    assert!(cache.contains(&"z"));
}

#[test]
fn test_size_is_capacity_count_is_occupancy() {
    let mut cache = LruCache::new(5).unwrap();
    cache.put(1, ());
    cache.put(2, ());
    assert_eq!(cache.size(), 5);
    assert_eq!(cache.count(), 2);
}

#[test]
fn test_prefetcher_sees_reads_and_writes() {
    let recorder = Recorder::default();
    let events = recorder.events.clone();
    let mut cache = LruCache::with_prefetcher(2, recorder).unwrap();

    cache.put(1u32, 'a');
    cache.get(&1).unwrap();
    let _ = cache.get(&7);
    cache.contains(&1);
    cache.invalidate(&1);

    assert_eq!(
        *events.lock().unwrap(),
        vec![(1, AccessMode::Write), (1, AccessMode::Read)]
    );
    assert_eq!(cache.prefetch_hint(), PrefetchHint::Keys(vec![2]));

    cache.reset_prefetcher();
    assert!(cache.prefetch_hint().is_nothing());
}

#[test]
fn test_no_prefetcher_means_no_hint() {
    let mut cache: LruCache<u32, u32> = LruCache::new(1).unwrap();
    cache.put(0, 0);
    assert!(cache.prefetch_hint().is_nothing());
}

#[test]
fn test_stats_track_traffic() {
    let mut cache = LruCache::new(1).unwrap();
    cache.put(1u32, 10u32);
    cache.put(1, 11);
    cache.put(2, 20);
    cache.get(&2).unwrap();
    assert!(cache.get(&1).is_err());
    cache.invalidate_all();

    let stats = cache.stats();
    assert_eq!(stats.inserts, 2);
    assert_eq!(stats.updates, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.invalidations, 1);
}

#[derive(Debug, Clone)]
enum Op {
    Put(u8),
    Get(u8),
    Invalidate(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u8>().prop_map(Op::Put),
        2 => any::<u8>().prop_map(Op::Get),
        1 => any::<u8>().prop_map(Op::Invalidate),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Occupancy never exceeds capacity, whatever the access sequence.
    #[test]
    fn prop_capacity_invariant(
        capacity in 1usize..16,
        ops in proptest::collection::vec(op_strategy(), 0..200),
    ) {
        let mut cache = LruCache::new(capacity).unwrap();
        for op in ops {
            match op {
                Op::Put(k) => { cache.put(k, u32::from(k)); }
                Op::Get(k) => { let _ = cache.get(&k); }
                Op::Invalidate(k) => { cache.invalidate(&k); }
            }
            prop_assert!(cache.count() <= cache.size());
        }
    }

    /// The evicted entry is always the one with the smallest stamp.
    #[test]
    fn prop_eviction_takes_oldest_stamp(
        keys in proptest::collection::vec(0u8..32, 1..100),
    ) {
        let mut cache = LruCache::new(4).unwrap();
        for k in keys {
            let oldest = cache.iter().min_by_key(|(_, _, stamp)| *stamp).map(|(key, _, _)| *key);
            let full = cache.count() == cache.size();
            let fresh = !cache.contains(&k);
            let evicted = cache.put(k, ());
            if full && fresh {
                prop_assert_eq!(evicted.map(|(key, _)| key), oldest);
            } else {
                prop_assert!(evicted.is_none());
            }
        }
    }
}
