//! Sink configuration
//!
//! A single flat struct covering the queue, flush, prune, and redaction
//! knobs. Hosts typically deserialize it from their own config file and
//! hand it to [`crate::open`].

use crate::error::{Result, SinkError};
use crate::queued::QueuedStoreConfig;
use crate::redact::RedactionPolicy;
use crate::store::PruneConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// SQLite database URL, e.g. `sqlite:spyglass.db`
    pub database_url: String,

    /// Nominal entries per flush
    pub batch_size: usize,
    /// Flush timer period in milliseconds
    pub process_interval_ms: u64,
    /// Queue depth above which a warning is logged
    pub warn_threshold: usize,
    /// Pre-reserve queue capacity
    pub preallocate: bool,

    /// On-disk size ceiling; pruning is disabled when unset
    pub max_size_bytes: Option<u64>,
    /// How far below the ceiling pruning drives the store
    pub prune_target_bytes: Option<u64>,

    /// Header names to mask (case-insensitive); empty means defaults
    pub hidden_headers: Vec<String>,
    /// Body field names to mask; empty means defaults
    pub hidden_body_fields: Vec<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:spyglass.db".to_string(),
            batch_size: 100,
            process_interval_ms: 100,
            warn_threshold: 100_000,
            preallocate: true,
            max_size_bytes: None,
            prune_target_bytes: None,
            hidden_headers: Vec::new(),
            hidden_body_fields: Vec::new(),
        }
    }
}

impl SinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SinkError::Config("batch_size must be at least 1".to_string()));
        }
        if self.process_interval_ms == 0 {
            return Err(SinkError::Config(
                "process_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn queued_config(&self) -> QueuedStoreConfig {
        QueuedStoreConfig {
            batch_size: self.batch_size,
            process_interval: Duration::from_millis(self.process_interval_ms),
            warn_threshold: self.warn_threshold,
            preallocate: self.preallocate,
        }
    }

    pub fn prune_config(&self) -> PruneConfig {
        PruneConfig {
            max_size_bytes: self.max_size_bytes,
            prune_target_bytes: self.prune_target_bytes,
        }
    }

    pub fn redaction_policy(&self) -> RedactionPolicy {
        RedactionPolicy::new(self.hidden_headers.clone(), self.hidden_body_fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SinkConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.process_interval_ms, 100);
        assert_eq!(config.warn_threshold, 100_000);
        assert!(config.preallocate);
        assert!(config.max_size_bytes.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_batch_size() {
        let config = SinkConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_partial_document() {
        let config: SinkConfig = serde_json::from_str(
            r#"{ "batch_size": 50, "max_size_bytes": 1073741824, "prune_target_bytes": 268435456 }"#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 50);
        assert_eq!(config.process_interval_ms, 100);
        assert_eq!(config.prune_config().max_size_bytes, Some(1 << 30));
    }
}
