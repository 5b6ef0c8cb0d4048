//! spyglass — embedded observability sink
//!
//! Accepts discrete telemetry entries (requests, queries, cache
//! operations, exceptions, mail) from instrumentation hooks and persists
//! them to a local SQLite file for later inspection:
//!
//! ```text
//! producer → IngestQueue (non-blocking) → flush task (batched) → SQLite
//!                                          readers ← paginate / find ←┘
//! ```
//!
//! Ingestion is fire-and-forget: `save` never blocks on storage I/O, and
//! background failures are logged rather than surfaced. Reads go straight
//! to the store, so queued entries become visible only after the next
//! flush tick.

pub mod config;
pub mod entry;
pub mod error;
pub mod queue;
pub mod queued;
pub mod redact;
pub mod signals;
pub mod store;

pub use config::SinkConfig;
pub use entry::{Entry, EntryKind, NewEntry};
pub use error::{Result, SinkError};
pub use queued::{QueuedStore, QueuedStoreConfig};
pub use redact::{RedactionPolicy, MASK};
pub use store::{Page, PageMeta, PageRequest, PruneConfig, SqliteStore, Store};

use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Open the sink described by `config`: build the SQLite store, wrap it
/// in the write-behind queue, and arm the flush task.
///
/// # Example
///
/// ```ignore
/// let sink = spyglass::open(SinkConfig::default()).await?;
/// sink.save(NewEntry::new(EntryKind::Request, payload));
/// // ... at process shutdown:
/// sink.stop().await;
/// ```
pub async fn open(config: SinkConfig) -> Result<QueuedStore<SqliteStore>> {
    config.validate()?;

    let store = SqliteStore::open(&config.database_url, config.prune_config()).await?;
    let queued = QueuedStore::new(Arc::new(store), config.queued_config());
    queued.start().await;

    Ok(queued)
}

/// Initialize tracing/logging for hosts that don't bring their own
/// subscriber. Can only be called once per process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
