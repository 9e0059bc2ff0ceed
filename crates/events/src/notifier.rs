//! The notifier seam and the firmware notification payload.

use async_trait::async_trait;
use serde::Serialize;

/// Body used when a release carries no notes.
pub const DEFAULT_NOTIFICATION_BODY: &str =
    "A new firmware update is available. Connect to your device and update now.";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for notification delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Push gateway returned HTTP {0}")]
    HttpStatus(u16),

    /// No delivery channel is configured.
    #[error("Notifications are not configured")]
    Disabled,
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Structured data attached to a firmware push message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirmwareNotificationData {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub version: String,
    pub action: &'static str,
}

/// A topic message announcing a new firmware version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirmwareNotification {
    pub topic: String,
    pub title: String,
    pub body: String,
    pub data: FirmwareNotificationData,
}

impl FirmwareNotification {
    /// Build the announcement for `version`, using the release notes as the
    /// body when present.
    pub fn firmware_available(
        topic: impl Into<String>,
        version: &str,
        release_notes: Option<&str>,
    ) -> Self {
        let body = release_notes
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .unwrap_or(DEFAULT_NOTIFICATION_BODY);
        Self {
            topic: topic.into(),
            title: format!("Firmware v{version} Available"),
            body: body.to_string(),
            data: FirmwareNotificationData {
                kind: "firmware_update",
                version: version.to_string(),
                action: "update_available",
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Seam
// ---------------------------------------------------------------------------

/// Informs device owners that a firmware version has been published.
///
/// Constructed once at startup and shared as `Arc<dyn FirmwareNotifier>`.
#[async_trait]
pub trait FirmwareNotifier: Send + Sync {
    async fn notify_firmware_available(
        &self,
        version: &str,
        release_notes: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Notifier used when no delivery channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl FirmwareNotifier for DisabledNotifier {
    async fn notify_firmware_available(
        &self,
        version: &str,
        _release_notes: Option<&str>,
    ) -> Result<(), NotifyError> {
        tracing::warn!(version, "Push gateway not configured; skipping firmware notification");
        Err(NotifyError::Disabled)
    }
}
