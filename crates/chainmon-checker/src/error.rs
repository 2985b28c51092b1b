/// Errors surfaced by a checker pass.
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error("Checker: storage failure: {0}")]
    Storage(#[from] chainmon_storage::error::StorageError),
}

/// Convenience `Result` alias for checker operations.
pub type Result<T> = std::result::Result<T, CheckerError>;
