//! Outbound alarm transport for chainmon alert dispatch.
//!
//! The alert dispatcher hands a fully-rendered payload (the alarmer's
//! templated parameter map plus a `text` field with the message body) to an
//! [`AlarmTransport`] by channel name. Delivery is fire-and-forget from the
//! engine's point of view: failures are reported to the caller for logging
//! but never retried across cycles.

pub mod error;
pub mod webhook;

use async_trait::async_trait;
use error::Result;
use serde_json::{Map, Value};

/// Payload map delivered to a channel: rendered alarmer params + `text`.
pub type AlarmPayload = Map<String, Value>;

/// A named outbound notification channel.
#[async_trait]
pub trait AlarmTransport: Send + Sync {
    /// Delivers `payload` to the channel registered as `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error when the channel is unknown or delivery fails
    /// after the transport's internal retries.
    async fn invoke(&self, channel: &str, payload: &AlarmPayload) -> Result<()>;
}
