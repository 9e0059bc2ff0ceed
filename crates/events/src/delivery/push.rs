//! Push gateway delivery with exponential-backoff retry.
//!
//! [`PushGatewayNotifier`] POSTs a JSON-encoded [`FirmwareNotification`] to
//! the configured gateway URL. Failed attempts are retried twice with
//! backoff (1 s, 2 s).

use std::time::Duration;

use async_trait::async_trait;

use crate::notifier::{FirmwareNotification, FirmwareNotifier, NotifyError};

/// Retry delays in seconds.
const RETRY_DELAYS_SECS: [u64; 2] = [1, 2];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Topic used when `PUSH_TOPIC` is unset.
pub const DEFAULT_TOPIC: &str = "all_users";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Push gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Gateway endpoint. `None` disables notifications.
    pub gateway_url: Option<String>,
    /// Topic every firmware announcement is sent to.
    pub topic: String,
}

impl PushConfig {
    /// | Env Var            | Default     |
    /// |--------------------|-------------|
    /// | `PUSH_GATEWAY_URL` | unset       |
    /// | `PUSH_TOPIC`       | `all_users` |
    pub fn from_env() -> Self {
        let gateway_url = std::env::var("PUSH_GATEWAY_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let topic = std::env::var("PUSH_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC.into());
        Self { gateway_url, topic }
    }
}

// ---------------------------------------------------------------------------
// PushGatewayNotifier
// ---------------------------------------------------------------------------

/// Delivers firmware announcements to an HTTP push gateway.
pub struct PushGatewayNotifier {
    client: reqwest::Client,
    url: String,
    topic: String,
}

impl PushGatewayNotifier {
    /// Create a notifier with a pre-configured HTTP client.
    pub fn new(url: impl Into<String>, topic: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            topic: topic.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, payload: &FirmwareNotification) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl FirmwareNotifier for PushGatewayNotifier {
    async fn notify_firmware_available(
        &self,
        version: &str,
        release_notes: Option<&str>,
    ) -> Result<(), NotifyError> {
        let payload = FirmwareNotification::firmware_available(&self.topic, version, release_notes);

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(&payload).await {
                Ok(()) => {
                    tracing::info!(version, topic = %self.topic, "Firmware notification sent");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        error = %e,
                        "Push delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(&payload).await.inspect_err(|e| {
            tracing::error!(url = %self.url, error = %e, "Push delivery failed after all retries");
        })?;
        tracing::info!(version, topic = %self.topic, "Firmware notification sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
