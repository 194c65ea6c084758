//! Data source: the consumer-facing coordinator.
//!
//! A data source owns one backend and, optionally, one cache. It:
//! - Checks the backend's capability flags before dispatching anything
//! - Routes reads and writes through the cache (read-through, write-through)
//! - Offers bypass variants that leave the cache untouched
//! - Turns the cache prefetcher's hints into backend loads

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::backend::{Backend, BatchIter, Capabilities, Description, Key, RecordIter};
use crate::cache::prefetcher::{PrefetchContext, PrefetchHint, SequentialPrefetcher};
use crate::cache::{Cache, LruCache};
use crate::config::Config;
use crate::error::{DataError, Result};

/// Backend plus optional cache.
pub struct DataSource<B: Backend> {
    backend: B,
    cache: Option<Box<dyn Cache<Key, B::Record>>>,
}

impl<B: Backend> DataSource<B> {
    /// Uncached data source: every call goes straight to the backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    pub fn with_cache<C>(backend: B, cache: C) -> Self
    where
        C: Cache<Key, B::Record> + 'static,
    {
        Self {
            backend,
            cache: Some(Box::new(cache)),
        }
    }

    /// Builds the cache and prefetcher the configuration asks for.
    pub fn from_config(backend: B, config: &Config) -> Result<Self>
    where
        B::Record: Send + 'static,
    {
        if !config.cache.enabled {
            return Ok(Self::new(backend));
        }

        let mut cache: LruCache<Key, B::Record> = LruCache::new(config.cache.capacity)?;
        if config.prefetch.enabled {
            let capabilities = backend.capabilities();
            let record_count = if capabilities.random_access {
                Some(backend.len()?)
            } else {
                None
            };
            let context = PrefetchContext {
                capabilities,
                cache_capacity: config.cache.capacity,
                record_count,
            };
            cache.set_prefetcher(SequentialPrefetcher::new(context, config.prefetch.read_ahead));
        }
        Ok(Self::with_cache(backend, cache))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn cache(&self) -> Option<&dyn Cache<Key, B::Record>> {
        self.cache.as_deref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut (dyn Cache<Key, B::Record> + 'static)> {
        self.cache.as_deref_mut()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    pub fn description(&self) -> &Description {
        self.backend.description()
    }

    pub fn len(&self) -> Result<usize> {
        self.backend.len()
    }

    /// Records in source order, bypassing the cache.
    pub fn iterate(&self) -> Result<RecordIter<'_, B::Record>> {
        self.capabilities().require_read()?;
        self.backend.iterate()
    }

    /// Record groups, bypassing the cache.
    pub fn batches(&self, size: Option<usize>) -> Result<BatchIter<'_, B::Record>> {
        self.capabilities().require_read()?;
        self.backend.batches(size)
    }

    /// Read-through: a hit returns the cached value, a miss reads the
    /// backend and caches the result.
    ///
    /// Random access is only required on a miss, so records a prefetch
    /// pulled from a stream can be read back by position.
    pub fn read(&mut self, key: Key) -> Result<B::Record> {
        let capabilities = self.capabilities();
        capabilities.require_read()?;

        let Some(cache) = self.cache.as_mut() else {
            capabilities.require_random_access()?;
            trace!(key, "Uncached read");
            return self.backend.at(key);
        };

        if let Ok(value) = cache.get(&key) {
            return Ok(value.clone());
        }

        capabilities.require_random_access()?;
        let value = self.backend.at(key)?;
        if let Some((evicted, _)) = cache.put(key, value.clone()) {
            trace!(key, evicted, "Read miss displaced entry");
        }
        Ok(value)
    }

    /// Write-through: the backend first, then the cache.
    pub fn write(&mut self, key: Key, value: B::Record) -> Result<()> {
        self.capabilities().require_indexed_write()?;

        match self.cache.as_mut() {
            Some(cache) => {
                self.backend.set(key, value.clone())?;
                cache.put(key, value);
            }
            None => self.backend.set(key, value)?,
        }
        Ok(())
    }

    /// Gather-read whose results are cached in order; a repeated key's last
    /// occurrence decides its final recency.
    pub fn gather(&mut self, keys: &[Key]) -> Result<Vec<B::Record>> {
        self.capabilities().require_indexed_read()?;

        let values = self.backend.gather(keys)?;
        if let Some(cache) = self.cache.as_mut() {
            for (&key, value) in keys.iter().zip(&values) {
                cache.put(key, value.clone());
            }
        }
        Ok(values)
    }

    /// Non-temporal gather: reads the backend, never touches the cache.
    /// Results may differ from what the cache holds for the same keys.
    pub fn gather_bypass(&self, keys: &[Key]) -> Result<Vec<B::Record>> {
        self.capabilities().require_indexed_read()?;
        self.backend.gather(keys)
    }

    /// Write-through scatter.
    pub fn scatter(&mut self, pairs: &[(Key, B::Record)]) -> Result<()> {
        self.capabilities().require_indexed_write()?;

        self.backend.scatter(pairs)?;
        if let Some(cache) = self.cache.as_mut() {
            for (key, value) in pairs {
                cache.put(*key, value.clone());
            }
        }
        Ok(())
    }

    /// Non-temporal scatter: updates the backend only. Cached copies of the
    /// written keys stay as they were until the next cache-affecting access.
    pub fn scatter_bypass(&mut self, pairs: &[(Key, B::Record)]) -> Result<()> {
        self.capabilities().require_indexed_write()?;
        self.backend.scatter(pairs)
    }

    /// Deletes `key` from the backend and drops any cached copy.
    pub fn delete(&mut self, key: Key) -> Result<()> {
        self.capabilities().require_indexed_write()?;

        self.backend.delete(key)?;
        if let Some(cache) = self.cache.as_mut() {
            cache.invalidate(&key);
        }
        Ok(())
    }

    /// Loads whatever the cache's prefetcher suggests. Returns the number of
    /// records read or pulled; 0 when there is no cache, no prefetcher, no
    /// suggestion, or the stream is exhausted.
    pub fn prefetch(&mut self) -> Result<usize> {
        let Some(cache) = self.cache.as_mut() else {
            return Ok(0);
        };

        match cache.prefetch_hint() {
            PrefetchHint::Nothing => Ok(0),
            PrefetchHint::Keys(keys) => {
                self.backend.capabilities().require_indexed_read()?;
                debug!(keys = keys.len(), "Prefetching keys");
                for &key in &keys {
                    self.read(key)?;
                }
                Ok(keys.len())
            }
            PrefetchHint::Count(count) => {
                let capabilities = self.backend.capabilities();
                capabilities.require_read()?;
                capabilities.require_stream()?;

                let records = match self.backend.next_records(count) {
                    Ok(records) => records,
                    Err(DataError::Exhausted) => {
                        debug!("Stream exhausted, nothing to prefetch");
                        return Ok(0);
                    }
                    Err(e) => return Err(e),
                };

                let pulled = records.len();
                for (key, value) in records {
                    cache.put(key, value);
                }
                debug!(requested = count, pulled, "Prefetched from stream");
                Ok(pulled)
            }
        }
    }

    /// Restarts the backend's streaming cursor and the prefetcher's history.
    pub fn rewind(&mut self) {
        self.backend.rewind();
        if let Some(cache) = self.cache.as_mut() {
            cache.reset_prefetcher();
        }
    }
}

/// Data source shared with a background prefetch task.
pub type SharedDataSource<B> = Arc<Mutex<DataSource<B>>>;

pub fn new_shared_data_source<B: Backend>(data_source: DataSource<B>) -> SharedDataSource<B> {
    Arc::new(Mutex::new(data_source))
}

/// Runs one [`DataSource::prefetch`] on the blocking pool while holding the
/// data source's lock.
pub fn prefetch_in_background<B>(shared: SharedDataSource<B>) -> JoinHandle<Result<usize>>
where
    B: Backend + Send + 'static,
    B::Record: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut data_source = shared.lock().map_err(|_| DataError::LockPoisoned)?;
        data_source.prefetch()
    })
}
