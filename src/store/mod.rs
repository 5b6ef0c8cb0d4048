//! Durable entry storage
//!
//! The [`Store`] trait is the seam between the write-behind queue and
//! whatever persists entries; [`SqliteStore`] is the shipped
//! implementation (single WAL-mode SQLite file). `QueuedStore` decorates
//! any `Store`, so tests can substitute an in-memory double.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::entry::{Entry, EntryKind, NewEntry};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One page worth of list-view parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }
}

/// Pagination metadata computed alongside the rows themselves.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub last_page: u64,
    pub current_page: u64,
}

/// A page of entries plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub meta: PageMeta,
    pub data: Vec<Entry>,
}

/// On-disk footprint bounds. Pruning is disabled unless both values are
/// set and positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PruneConfig {
    pub max_size_bytes: Option<u64>,
    pub prune_target_bytes: Option<u64>,
}

impl PruneConfig {
    /// Returns `(max, target)` where `target` is the size pruning drives
    /// the store down to, or `None` when pruning is disabled.
    pub(crate) fn thresholds(&self) -> Option<(u64, u64)> {
        match (self.max_size_bytes, self.prune_target_bytes) {
            (Some(max), Some(prune)) if max > 0 && prune > 0 => {
                Some((max, max.saturating_sub(prune)))
            }
            _ => None,
        }
    }
}

/// Persistence operations the ingestion pipeline and query facade rely on.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist one entry, assigning `id` and `created_at` when absent.
    async fn insert(&self, entry: NewEntry) -> Result<()>;

    /// List entries of one kind, newest first. With
    /// `include_full_data = false` only the minimal projection is
    /// deserialized into `Entry::data`.
    async fn paginate(
        &self,
        kind: EntryKind,
        page: PageRequest,
        include_full_data: bool,
    ) -> Result<Page>;

    /// Point lookup by primary key and kind. Not-found is `Ok(None)`.
    async fn find_by_id(&self, kind: EntryKind, id: &str) -> Result<Option<Entry>>;

    /// All entries of one kind referencing the given originating request,
    /// newest first.
    async fn find_by_correlation_id(
        &self,
        correlation_id: &str,
        kind: EntryKind,
        include_full_data: bool,
    ) -> Result<Vec<Entry>>;

    /// Total rows of one kind.
    async fn count(&self, kind: EntryKind) -> Result<u64>;

    /// Delete every row unconditionally.
    async fn truncate(&self) -> Result<()>;
}
