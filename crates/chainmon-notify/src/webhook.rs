use crate::error::{NotifyError, Result};
use crate::{AlarmPayload, AlarmTransport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

const SEND_ATTEMPTS: u32 = 3;

/// A single POST attempt may not outlive this; a black-holed endpoint must
/// not stall the dispatching checker.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook-based [`AlarmTransport`]: each channel name maps to one POST
/// endpoint; the payload is sent as a JSON body.
pub struct WebhookTransport {
    client: reqwest::Client,
    endpoints: HashMap<String, String>,
}

impl WebhookTransport {
    pub fn new(endpoints: HashMap<String, String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, endpoints })
    }
}

#[async_trait]
impl AlarmTransport for WebhookTransport {
    async fn invoke(&self, channel: &str, payload: &AlarmPayload) -> Result<()> {
        let url = self
            .endpoints
            .get(channel)
            .ok_or_else(|| NotifyError::UnknownChannel(channel.to_string()))?;

        let mut last_status = None;
        for attempt in 1..=SEND_ATTEMPTS {
            match self.client.post(url).json(payload).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    last_status = Some(resp.status().as_u16());
                    tracing::warn!(
                        channel,
                        attempt,
                        status = resp.status().as_u16(),
                        "webhook returned non-success status"
                    );
                }
                Err(e) => {
                    if attempt == SEND_ATTEMPTS {
                        return Err(e.into());
                    }
                    tracing::warn!(channel, attempt, error = %e, "webhook send failed");
                }
            }
            tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
        }

        Err(NotifyError::Api {
            channel: channel.to_string(),
            status: last_status.unwrap_or(0),
        })
    }
}
