use thiserror::Error;

/// Errors surfaced by the sink's synchronous API surface.
///
/// Background work (flushing, pruning) never returns these to a caller;
/// failures there are logged and the pipeline keeps going. Only ingest
/// validation and read-side queries propagate errors.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying SQLite failure (connect, insert, query)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entry payload could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored timestamp column did not parse as RFC 3339
    #[error("invalid timestamp in store: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// Entry kind is missing or not one of the known discriminants
    #[error("invalid entry kind: {0}")]
    InvalidKind(String),

    /// Rejected configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SinkError>;
