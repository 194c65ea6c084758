//! Runtime configuration for datasource-cache.
//!
//! Configuration can be loaded from a JSON file or constructed programmatically.
//! Source layout, cache capacity and prefetch window live here; command-line
//! flags override the file.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "datasource-cache",
    about = "Scan a delimited file through a cached data source"
)]
pub struct Cli {
    /// Delimited text file to read.
    pub input: PathBuf,

    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Records per batch (overrides the config file).
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Cache capacity in records (overrides the config file).
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Treat the first row as data rather than field names.
    #[arg(long)]
    pub no_header: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(batch_size) = self.batch_size {
            config.source.batch_size = batch_size;
        }
        if let Some(capacity) = self.capacity {
            config.cache.capacity = capacity;
        }
        if self.no_header {
            config.source.has_header = false;
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record source layout.
    pub source: SourceConfig,

    /// Cache sizing.
    pub cache: CacheConfig,

    /// Prefetching settings.
    pub prefetch: PrefetchConfig,
}

/// Layout of a delimited source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// First row holds field names.
    pub has_header: bool,

    /// Field separator; must be a single-byte character.
    pub delimiter: char,

    /// Default number of records per batch.
    pub batch_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: ',',
            batch_size: 100,
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Put an LRU cache in front of the backend.
    pub enabled: bool,

    /// Maximum number of cached records.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1000,
        }
    }
}

/// Prefetch strategy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Attach a sequential read-ahead prefetcher to the cache.
    pub enabled: bool,

    /// Records to load ahead of demand (capped at the cache capacity).
    pub read_ahead: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read_ahead: 64,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Reject settings no backend or cache can be built with.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.source.batch_size == 0 {
            return Err(DataError::invalid("source.batch_size must be at least 1"));
        }
        if !self.source.delimiter.is_ascii() {
            return Err(DataError::invalid("source.delimiter must be a single-byte character"));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(DataError::invalid("cache.capacity must be at least 1"));
        }
        Ok(())
    }
}
