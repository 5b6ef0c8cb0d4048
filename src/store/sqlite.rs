//! SQLite-backed entry store
//!
//! One table, one file. WAL journal mode with `synchronous = NORMAL`
//! lets readers paginate while the flush task writes, trading a small
//! durability window for throughput. After every insert the store checks
//! its page accounting and prunes oldest-first when the configured size
//! ceiling is exceeded.

use super::{Page, PageMeta, PageRequest, PruneConfig, Store};
use crate::entry::{Entry, EntryKind, NewEntry};
use crate::error::{Result, SinkError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Rows deleted per prune step, bounding single-transaction cost.
const PRUNE_BATCH_SIZE: i64 = 1000;

pub struct SqliteStore {
    pool: SqlitePool,
    prune: PruneConfig,
}

impl SqliteStore {
    /// Open (creating if missing) the entry database and set up the
    /// schema.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = SqliteStore::open("sqlite:spyglass.db", PruneConfig::default()).await?;
    /// ```
    pub async fn open(database_url: &str, prune: PruneConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal) // concurrent readers + single writer
            .busy_timeout(Duration::from_secs(30))
            .pragma("synchronous", "NORMAL")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(5) // SQLite has a single writer anyway
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        let store = Self { pool, prune };
        store.setup_schema().await?;

        tracing::debug!(url = %database_url, "entry store opened");
        Ok(store)
    }

    async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                minimal_data TEXT,
                data TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL,
                correlation_id TEXT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS entries_id_kind_index ON entries (id, kind)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS entries_correlation_id_index ON entries (correlation_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current on-disk footprint from SQLite's page accounting:
    /// `page_size * (page_count - freelist_count)`.
    pub async fn used_bytes(&self) -> Result<u64> {
        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;
        let freelist_count: i64 = sqlx::query_scalar("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await?;

        let used_pages = (page_count - freelist_count).max(0);
        Ok((used_pages as u64).saturating_mul(page_size.max(0) as u64))
    }

    /// Size-based prune check, run after every insert. Best-effort: any
    /// failure is logged and skipped for this cycle.
    async fn maybe_prune(&self) {
        let Some((max_bytes, target_bytes)) = self.prune.thresholds() else {
            return;
        };

        if let Err(e) = self.prune_to(max_bytes, target_bytes).await {
            tracing::warn!(error = %e, "prune cycle skipped");
        }
    }

    async fn prune_to(&self, max_bytes: u64, target_bytes: u64) -> Result<()> {
        let mut used = self.used_bytes().await?;
        if used < max_bytes {
            return Ok(());
        }

        let before = used;
        let mut deleted_total = 0u64;

        while used > target_bytes {
            let deleted = self.delete_oldest(PRUNE_BATCH_SIZE).await?;
            if deleted == 0 {
                break; // store exhausted
            }
            deleted_total += deleted;
            used = self.used_bytes().await?;
        }

        // Hand reclaimed pages back to the filesystem.
        if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
        {
            tracing::warn!(error = %e, "wal checkpoint after prune failed");
        }

        tracing::info!(
            deleted = deleted_total,
            before_bytes = before,
            after_bytes = used,
            "pruned oldest entries"
        );

        Ok(())
    }

    /// Delete the `batch_size` oldest rows across all kinds. Returns the
    /// number of rows actually removed.
    async fn delete_oldest(&self, batch_size: i64) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM entries WHERE id IN
             (SELECT id FROM entries ORDER BY created_at ASC LIMIT ?)",
        )
        .bind(batch_size)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    fn selected_columns(include_full_data: bool) -> &'static str {
        if include_full_data {
            "SELECT id, minimal_data, kind, created_at, correlation_id, data"
        } else {
            "SELECT id, minimal_data, kind, created_at, correlation_id"
        }
    }

    fn map_row(row: &SqliteRow, include_full_data: bool) -> Result<Entry> {
        let raw: String = if include_full_data {
            row.get("data")
        } else {
            row.get::<Option<String>, _>("minimal_data")
                .unwrap_or_else(|| "{}".to_string())
        };
        let data = serde_json::from_str(&raw)?;

        let kind: String = row.get("kind");
        let created_at: String = row.get("created_at");

        Ok(Entry {
            id: row.get("id"),
            kind: EntryKind::from_str(&kind)?,
            data,
            correlation_id: row.get("correlation_id"),
            created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert(&self, entry: NewEntry) -> Result<()> {
        let id = entry.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let created_at = entry
            .created_at
            .unwrap_or_else(Utc::now)
            // Fixed-width timestamps keep lexicographic order equal to
            // chronological order in the TEXT column.
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let data = serde_json::to_string(&entry.data)?;
        let minimal_data =
            serde_json::to_string(&entry.minimal_data.unwrap_or_else(|| serde_json::json!({})))?;

        sqlx::query(
            "INSERT INTO entries (id, minimal_data, data, kind, created_at, correlation_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&minimal_data)
        .bind(&data)
        .bind(entry.kind.as_str())
        .bind(&created_at)
        .bind(&entry.correlation_id)
        .execute(&self.pool)
        .await?;

        self.maybe_prune().await;

        Ok(())
    }

    async fn paginate(
        &self,
        kind: EntryKind,
        page: PageRequest,
        include_full_data: bool,
    ) -> Result<Page> {
        if page.per_page == 0 {
            return Err(SinkError::Config("per_page must be at least 1".to_string()));
        }
        let current_page = page.page.max(1);
        let offset = (current_page - 1) * page.per_page;

        let total = self.count(kind).await?;

        let sql = format!(
            "{} FROM entries WHERE kind = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
            Self::selected_columns(include_full_data)
        );
        let rows = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(page.per_page as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        let data = rows
            .iter()
            .map(|row| Self::map_row(row, include_full_data))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            meta: PageMeta {
                total,
                last_page: total.div_ceil(page.per_page),
                current_page,
            },
            data,
        })
    }

    async fn find_by_id(&self, kind: EntryKind, id: &str) -> Result<Option<Entry>> {
        let sql = format!(
            "{} FROM entries WHERE id = ? AND kind = ? LIMIT 1",
            Self::selected_columns(true)
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::map_row(&row, true)).transpose()
    }

    async fn find_by_correlation_id(
        &self,
        correlation_id: &str,
        kind: EntryKind,
        include_full_data: bool,
    ) -> Result<Vec<Entry>> {
        let sql = format!(
            "{} FROM entries WHERE kind = ? AND correlation_id = ? ORDER BY created_at DESC",
            Self::selected_columns(include_full_data)
        );
        let rows = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(correlation_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Self::map_row(row, include_full_data))
            .collect()
    }

    async fn count(&self, kind: EntryKind) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM entries WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn truncate(&self) -> Result<()> {
        sqlx::query("DELETE FROM entries").execute(&self.pool).await?;
        Ok(())
    }
}
