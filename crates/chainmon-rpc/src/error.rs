/// Errors that can occur while talking to a node's RPC endpoint.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("Rpc: transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success HTTP status.
    #[error("Rpc: {endpoint} returned HTTP {status}")]
    Api { endpoint: &'static str, status: u16 },

    /// The response body was not the expected JSON shape.
    #[error("Rpc: decode error from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A numeric field arrived as an unparseable string.
    #[error("Rpc: invalid value '{value}' for field '{field}'")]
    InvalidField { field: &'static str, value: String },
}

/// Convenience `Result` alias for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;
