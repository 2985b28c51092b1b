/// Errors that can occur within the alarm transport.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No endpoint is registered under the requested channel name.
    #[error("Notify: unknown channel '{0}'")]
    UnknownChannel(String),

    /// An HTTP request to the channel endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The channel endpoint returned a non-success response after retries.
    #[error("Notify: channel '{channel}' returned HTTP {status}")]
    Api { channel: String, status: u16 },
}

/// Convenience `Result` alias for transport operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
