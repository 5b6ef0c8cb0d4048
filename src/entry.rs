//! Canonical telemetry entry model
//!
//! Every watcher (request, query, cache, exception, mail) produces the
//! same record shape; `kind` discriminates the payload and decides which
//! partition a list query scans. Entries are append-only: the store
//! supports insert, oldest-first pruning, and truncate — never update.

use crate::error::SinkError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Discriminator partitioning entries by origin type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Incoming HTTP request handled by the host application
    Request,
    /// Database query issued while handling a request
    Query,
    /// Cache hit/miss/write
    Cache,
    /// Unhandled exception
    Exception,
    /// Outgoing mail
    Mail,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Query => "query",
            Self::Cache => "cache",
            Self::Exception => "exception",
            Self::Mail => "mail",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "query" => Ok(Self::Query),
            "cache" => Ok(Self::Cache),
            "exception" => Ok(Self::Exception),
            "mail" => Ok(Self::Mail),
            other => Err(SinkError::InvalidKind(other.to_string())),
        }
    }
}

/// A stored telemetry entry, as returned by the read-side API.
///
/// `data` holds either the full payload or the minimal list-view
/// projection, depending on the `include_full_data` flag of the query
/// that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub kind: EntryKind,
    pub data: Value,
    /// Id of the originating request entry, if any. Purely a lookup key,
    /// not an ownership relation.
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An entry submitted for ingestion.
///
/// `id` and `created_at` are assigned at insert time when absent;
/// `minimal_data` defaults to an empty object. `kind` is mandatory —
/// a payload without one is rejected before it can be queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub kind: EntryKind,
    pub data: Value,
    #[serde(default)]
    pub minimal_data: Option<Value>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewEntry {
    pub fn new(kind: EntryKind, data: Value) -> Self {
        Self {
            id: None,
            kind,
            data,
            minimal_data: None,
            correlation_id: None,
            created_at: None,
        }
    }

    /// Parse an entry from a raw JSON payload, as handed over by a
    /// framework adapter. Missing or unknown `kind` is the malformed-entry
    /// rejection path: it fails here, synchronously, and never reaches
    /// the queue.
    pub fn from_json(value: Value) -> Result<Self, SinkError> {
        let entry: Self = serde_json::from_value(value)?;
        Ok(entry)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_minimal_data(mut self, minimal: Value) -> Self {
        self.minimal_data = Some(minimal);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            EntryKind::Request,
            EntryKind::Query,
            EntryKind::Cache,
            EntryKind::Exception,
            EntryKind::Mail,
        ] {
            assert_eq!(kind.as_str().parse::<EntryKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(matches!(
            "metric".parse::<EntryKind>(),
            Err(SinkError::InvalidKind(_))
        ));
    }

    #[test]
    fn from_json_accepts_minimal_payload() {
        let entry = NewEntry::from_json(json!({
            "kind": "query",
            "data": { "sql": "SELECT 1", "duration_ms": 3 },
        }))
        .unwrap();

        assert_eq!(entry.kind, EntryKind::Query);
        assert!(entry.id.is_none());
        assert!(entry.correlation_id.is_none());
    }

    #[test]
    fn from_json_rejects_missing_kind() {
        let result = NewEntry::from_json(json!({
            "data": { "sql": "SELECT 1" },
        }));
        assert!(result.is_err());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let entry = NewEntry::new(EntryKind::Cache, json!({"key": "user:1"}))
            .with_id("abc")
            .with_correlation_id("req-1")
            .with_minimal_data(json!({"key": "user:1"}));

        assert_eq!(entry.id.as_deref(), Some("abc"));
        assert_eq!(entry.correlation_id.as_deref(), Some("req-1"));
        assert!(entry.minimal_data.is_some());
    }
}
