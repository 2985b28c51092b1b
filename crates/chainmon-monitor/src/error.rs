/// Errors surfaced by a monitor cycle.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Monitor: rpc failure: {0}")]
    Rpc(#[from] chainmon_rpc::error::RpcError),

    #[error("Monitor: storage failure: {0}")]
    Storage(#[from] chainmon_storage::error::StorageError),
}

/// Convenience `Result` alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
