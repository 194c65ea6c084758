//! datasource-cache: storage-agnostic record access behind a bounded cache.
//!
//! A [`DataSource`](datasource::DataSource) puts one capability-checked
//! [`Backend`](backend::Backend) (a streaming delimited file, an in-memory
//! array, ...) behind an optional [`Cache`](cache::Cache) with LRU eviction
//! and a pluggable prefetcher. Consumers iterate, index, gather and scatter
//! records without caring which medium sits underneath.

pub mod backend;
pub mod cache;
pub mod config;
pub mod datasource;
pub mod error;

pub use backend::{ArrayBackend, Backend, Capabilities, CsvBackend, CsvOptions, Description, Key};
pub use cache::{AccessMode, Cache, CacheStats, LruCache, PrefetchHint, Prefetcher};
pub use datasource::{new_shared_data_source, prefetch_in_background, DataSource, SharedDataSource};
pub use error::{CapabilityError, DataError, Result};
