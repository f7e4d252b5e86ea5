//! Logging setup and adapter metrics.
//!
//! The adapter logs through `tracing`; binaries install a subscriber with
//! [`init_logging`]. [`AdapterMetrics`] keeps cheap atomic counters of what
//! the adapter has read from and written to the store.

use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `level` is an `EnvFilter` directive such as `info` or
/// `policy_store_adapter=debug`; `RUST_LOG` takes precedence when set.
pub fn init_logging(level: &str, json_format: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::config_key(format!("invalid log level {:?}: {}", level, e), "log_level"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let installed = if json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::config(format!("failed to set logging subscriber: {}", e)))
}

/// Counters of adapter activity.
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    records_loaded: AtomicU64,
    records_skipped: AtomicU64,
    records_inserted: AtomicU64,
    records_removed: AtomicU64,
    errors: AtomicU64,
}

impl AdapterMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rule decoded into the model.
    pub fn record_loaded(&self) {
        self.records_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stored document that could not be decoded.
    pub fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record rules written to the store.
    pub fn record_inserted(&self, count: u64) {
        self.records_inserted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record rules deleted from the store.
    pub fn record_removed(&self, count: u64) {
        self.records_removed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed operation.
    pub fn record_error(&self, _error: &Error) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_loaded: self.records_loaded.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            records_inserted: self.records_inserted.load(Ordering::Relaxed),
            records_removed: self.records_removed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`AdapterMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Rules decoded into a model
    pub records_loaded: u64,
    /// Stored documents skipped because they could not be decoded
    pub records_skipped: u64,
    /// Rules inserted
    pub records_inserted: u64,
    /// Rules deleted
    pub records_removed: u64,
    /// Failed operations
    pub errors: u64,
}
