//! Notification dispatch for newly published firmware.
//!
//! - [`FirmwareNotifier`] -- the seam the OTA service calls after a publish.
//! - [`PushGatewayNotifier`] -- HTTP delivery to a push gateway topic.
//! - [`DisabledNotifier`] -- used when no gateway is configured.
//!
//! Delivery is best-effort: callers log failures and carry on.

pub mod delivery;
pub mod notifier;

pub use delivery::push::{PushConfig, PushGatewayNotifier};
pub use notifier::{DisabledNotifier, FirmwareNotification, FirmwareNotifier, NotifyError};
