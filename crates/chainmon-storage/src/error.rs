/// Errors that can occur within the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored epoch-millisecond value could not be converted back to a
    /// timestamp.
    #[error("Storage: invalid timestamp in column '{column}': {millis}")]
    InvalidTimestamp { column: &'static str, millis: i64 },
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
