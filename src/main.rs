//! datasource-cache: scan a delimited file through a cached data source.
//!
//! Reads the whole file once in batches (bypassing the cache), then streams
//! it through the LRU cache with background read-ahead, consuming each
//! prefetched window by position.

use std::time::Instant;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;

use datasource_cache::backend::{Backend, CsvBackend, CsvOptions};
use datasource_cache::config::{Cli, Config};
use datasource_cache::datasource::{new_shared_data_source, prefetch_in_background, DataSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "datasource_cache=debug"
    } else {
        "datasource_cache=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("datasource-cache v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;

    info!(
        input = %cli.input.display(),
        batch_size = config.source.batch_size,
        cache = config.cache.enabled,
        capacity = config.cache.capacity,
        read_ahead = config.prefetch.read_ahead,
        "Configuration loaded"
    );

    let backend = CsvBackend::open(&cli.input, CsvOptions::try_from(&config.source)?)?;
    info!(description = %backend.description(), records = backend.len()?, "Source opened");

    let data_source = DataSource::from_config(backend, &config)?;

    // Full scan, cache untouched.
    let started = Instant::now();
    let mut batches = 0usize;
    let mut rows = 0usize;
    for batch in data_source.batches(None)? {
        let batch = batch?;
        batches += 1;
        rows += batch.len();
    }
    info!(batches, rows, elapsed_ms = started.elapsed().as_millis() as u64, "Scan complete");

    // Warm the cache from the stream and consume each window by position.
    let started = Instant::now();
    let shared = new_shared_data_source(data_source);
    let mut consumed = 0usize;
    loop {
        let loaded = prefetch_in_background(shared.clone()).await??;
        if loaded == 0 {
            break;
        }

        let mut data_source = shared.lock().map_err(|_| anyhow!("data source lock poisoned"))?;
        for key in consumed..consumed + loaded {
            data_source.read(key)?;
        }
        consumed += loaded;
    }

    let data_source = shared.lock().map_err(|_| anyhow!("data source lock poisoned"))?;
    match data_source.cache() {
        Some(cache) => {
            let stats = cache.stats();
            info!(
                consumed,
                cached = cache.count(),
                hits = stats.hits,
                misses = stats.misses,
                evictions = stats.evictions,
                hit_ratio = stats.hit_ratio(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Streamed through cache"
            );
        }
        None => info!("Cache disabled, skipped warm-up"),
    }

    Ok(())
}
