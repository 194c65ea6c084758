//! Prefetching: observes cache traffic and suggests what to load before it
//! is asked for.
//!
//! A [`Prefetcher`] only proposes. The data source decides how to act on a
//! [`PrefetchHint`]: a key set becomes indexed reads, a count becomes a pull
//! from the backend's streaming cursor.
//!
//! [`SequentialPrefetcher`] is a sliding read-ahead window, useful for scans
//! and as a reference policy.

use std::collections::{BTreeSet, VecDeque};

use crate::backend::{Capabilities, Key};
use crate::cache::AccessMode;

/// What a prefetcher wants loaded next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchHint<K> {
    /// Keys to read from a random-access backend.
    Keys(Vec<K>),
    /// Number of records to pull from a streaming backend.
    Count(usize),
    Nothing,
}

impl<K> PrefetchHint<K> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, PrefetchHint::Nothing)
    }
}

/// Static facts a policy can specialise on, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchContext {
    pub capabilities: Capabilities,
    pub cache_capacity: usize,
    /// Known record count of a random-access backend.
    pub record_count: Option<usize>,
}

/// Observer of cache accesses that proposes future loads.
pub trait Prefetcher<K>: Send {
    /// Records one access.
    fn observe(&mut self, key: &K, mode: AccessMode);

    /// Proposes the next load, or [`PrefetchHint::Nothing`].
    fn suggest(&mut self) -> PrefetchHint<K>;

    /// Forgets all observed history.
    fn reset(&mut self);
}

/// Sliding read-ahead over record positions.
///
/// Random-access backends: after a demand access to `k`, suggests the keys
/// `k+1..=k+window` that are in range and not already outstanding. Accesses
/// to outstanding keys are the prefetch itself landing and are not demand.
///
/// Streaming backends: suggests `Count(window)` on the first call and again
/// after every demand read.
#[derive(Debug, Clone)]
pub struct SequentialPrefetcher {
    context: PrefetchContext,
    window: usize,
    history: VecDeque<(Key, AccessMode)>,
    last_demand: Option<Key>,
    outstanding: BTreeSet<Key>,
    primed: bool,
    reads_since_suggest: usize,
}

impl SequentialPrefetcher {
    /// `read_ahead` is capped at the cache capacity.
    pub fn new(context: PrefetchContext, read_ahead: usize) -> Self {
        Self {
            window: read_ahead.min(context.cache_capacity),
            history: VecDeque::with_capacity(context.cache_capacity.min(1024)),
            context,
            last_demand: None,
            outstanding: BTreeSet::new(),
            primed: false,
            reads_since_suggest: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Most recent observations, oldest first. Holds at most one cache's
    /// worth of events.
    pub fn history(&self) -> impl Iterator<Item = &(Key, AccessMode)> + '_ {
        self.history.iter()
    }

    /// Keys suggested but not yet seen landing in the cache.
    pub fn outstanding(&self) -> impl Iterator<Item = &Key> + '_ {
        self.outstanding.iter()
    }

    fn suggest_keys(&mut self) -> PrefetchHint<Key> {
        let Some(last) = self.last_demand.take() else {
            return PrefetchHint::Nothing;
        };

        let end = match self.context.record_count {
            Some(count) => last.saturating_add(self.window).min(count.saturating_sub(1)),
            None => last.saturating_add(self.window),
        };
        let keys: Vec<Key> = (last.saturating_add(1)..=end)
            .filter(|k| !self.outstanding.contains(k))
            .collect();

        if keys.is_empty() {
            return PrefetchHint::Nothing;
        }
        self.outstanding.extend(keys.iter().copied());
        PrefetchHint::Keys(keys)
    }

    fn suggest_count(&mut self) -> PrefetchHint<Key> {
        if self.primed && self.reads_since_suggest == 0 {
            return PrefetchHint::Nothing;
        }
        self.primed = true;
        self.reads_since_suggest = 0;
        PrefetchHint::Count(self.window)
    }
}

impl Prefetcher<Key> for SequentialPrefetcher {
    fn observe(&mut self, key: &Key, mode: AccessMode) {
        if self.history.len() >= self.context.cache_capacity.max(1) {
            self.history.pop_front();
        }
        self.history.push_back((*key, mode));

        if self.context.capabilities.stream {
            if mode == AccessMode::Read {
                self.reads_since_suggest += 1;
            }
            return;
        }

        if !self.outstanding.remove(key) {
            self.last_demand = Some(*key);
        }
    }

    fn suggest(&mut self) -> PrefetchHint<Key> {
        if self.window == 0 {
            return PrefetchHint::Nothing;
        }
        if self.context.capabilities.random_access {
            self.suggest_keys()
        } else if self.context.capabilities.stream {
            self.suggest_count()
        } else {
            PrefetchHint::Nothing
        }
    }

    fn reset(&mut self) {
        self.history.clear();
        self.last_demand = None;
        self.outstanding.clear();
        self.primed = false;
        self.reads_since_suggest = 0;
    }
}
