//! Firmware publish and OTA report rules.
//!
//! Everything here is pure: callers run these checks before touching the
//! artifact store or the database so invalid input never causes I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pagination::clamp_limit;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Prefix of every stored artifact file name.
pub const FIRMWARE_FILENAME_PREFIX: &str = "esp32p4_v";

/// Required artifact extension (uploads and stored files).
pub const FIRMWARE_EXTENSION: &str = ".bin";

/// Path of the stable download endpoint, appended to the public base URL.
pub const DOWNLOAD_PATH: &str = "/api/firmware/download";

/// Rollout percent applied when the publisher does not supply one.
pub const DEFAULT_ROLLOUT_PERCENT: i32 = 100;

/// Default maximum artifact size (16 MiB).
pub const DEFAULT_MAX_ARTIFACT_BYTES: usize = 16 * 1024 * 1024;

/// Default number of reports returned by a query.
pub const DEFAULT_REPORT_LIMIT: i64 = 100;

/// Upper bound on reports returned by a single query.
pub const MAX_REPORT_LIMIT: i64 = 1000;

/// Column widths from the `firmware_metadata` / `firmware_reports` schema.
pub const MAX_VERSION_LEN: usize = 50;
pub const MAX_DEVICE_ID_LEN: usize = 100;
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Publish validation
// ---------------------------------------------------------------------------

/// Validate a version string.
///
/// The version is embedded in the artifact file name, so only characters
/// that are safe in a single path component are accepted.
pub fn validate_version(version: &str) -> Result<(), CoreError> {
    if version.trim().is_empty() {
        return Err(CoreError::Validation("Version must not be empty".into()));
    }
    if version.len() > MAX_VERSION_LEN {
        return Err(CoreError::Validation(format!(
            "Version must be at most {MAX_VERSION_LEN} characters"
        )));
    }
    if version.starts_with('.') {
        return Err(CoreError::Validation(format!(
            "Version '{version}' must not start with '.'"
        )));
    }
    if let Some(bad) = version
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')))
    {
        return Err(CoreError::Validation(format!(
            "Version '{version}' contains invalid character '{bad}'. \
             Allowed: letters, digits, '.', '-', '_', '+'"
        )));
    }
    Ok(())
}

/// Validate the advisory minimum version, when one is given.
pub fn validate_min_version(min_version: Option<&str>) -> Result<(), CoreError> {
    match min_version {
        Some(v) => validate_version(v)
            .map_err(|e| CoreError::Validation(format!("Invalid min_version: {e}"))),
        None => Ok(()),
    }
}

/// Validate that a rollout percent lies in `0..=100`.
pub fn validate_rollout_percent(percent: i32) -> Result<(), CoreError> {
    if (0..=100).contains(&percent) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "rollout_percent must be between 0 and 100, got {percent}"
        )))
    }
}

/// Validate an artifact length against the configured maximum.
pub fn validate_artifact_size(len: usize, max_bytes: usize) -> Result<(), CoreError> {
    if len == 0 {
        return Err(CoreError::Validation("Firmware file is empty".into()));
    }
    if len > max_bytes {
        return Err(CoreError::Validation(format!(
            "Firmware file too large ({len} bytes). Maximum size: {max_bytes} bytes"
        )));
    }
    Ok(())
}

/// Validate that an uploaded file name carries the `.bin` extension.
pub fn validate_artifact_extension(filename: &str) -> Result<(), CoreError> {
    if filename.to_ascii_lowercase().ends_with(FIRMWARE_EXTENSION) {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Invalid file type. Only .bin files are allowed.".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Deterministic artifact file name for a version.
///
/// Every publish attempt for the same version targets the same file, which
/// is what makes cleanup after a failed commit safe.
pub fn firmware_filename(version: &str) -> String {
    format!("{FIRMWARE_FILENAME_PREFIX}{version}{FIRMWARE_EXTENSION}")
}

/// Stable download URL stored on each catalog row.
pub fn download_url(base_url: &str) -> String {
    format!("{}{DOWNLOAD_PATH}", base_url.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// OTA outcome reported by a device.
///
/// Transitions are not enforced: the report table is a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Success,
    Failed,
    InProgress,
}

impl ReportStatus {
    /// Database / wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::InProgress => "in_progress",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "in_progress" => Ok(Self::InProgress),
            other => Err(CoreError::Validation(format!(
                "Invalid status '{other}'. Must be one of: success, failed, in_progress"
            ))),
        }
    }
}

/// Validate the identifying fields of a device report.
pub fn validate_report_identity(device_id: &str, firmware_version: &str) -> Result<(), CoreError> {
    if device_id.trim().is_empty() {
        return Err(CoreError::Validation("device_id must not be empty".into()));
    }
    if device_id.len() > MAX_DEVICE_ID_LEN {
        return Err(CoreError::Validation(format!(
            "device_id must be at most {MAX_DEVICE_ID_LEN} characters"
        )));
    }
    if firmware_version.trim().is_empty() {
        return Err(CoreError::Validation(
            "firmware_version must not be empty".into(),
        ));
    }
    if firmware_version.len() > MAX_VERSION_LEN {
        return Err(CoreError::Validation(format!(
            "firmware_version must be at most {MAX_VERSION_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate an optional progress percentage.
pub fn validate_progress_percent(progress: Option<i32>) -> Result<(), CoreError> {
    match progress {
        Some(p) if !(0..=100).contains(&p) => Err(CoreError::Validation(format!(
            "progress_percent must be between 0 and 100, got {p}"
        ))),
        _ => Ok(()),
    }
}

/// Truncate a device-supplied error message to the column width.
pub fn truncate_error_message(message: Option<String>) -> Option<String> {
    message.map(|m| {
        if m.chars().count() > MAX_ERROR_MESSAGE_LEN {
            m.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
        } else {
            m
        }
    })
}

/// Clamp a user-provided report limit to `1..=MAX_REPORT_LIMIT`.
pub fn clamp_report_limit(limit: Option<i64>) -> i64 {
    clamp_limit(limit, DEFAULT_REPORT_LIMIT, MAX_REPORT_LIMIT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_like_versions_are_accepted() {
        for v in ["1.0.4", "2.0.0-rc.1", "1.2.3+build.7", "v10_beta"] {
            assert!(validate_version(v).is_ok(), "{v} should be valid");
        }
    }

    #[test]
    fn path_like_versions_are_rejected() {
        for v in ["", "  ", "../etc", "1.0/2", "1.0\\2", ".hidden", "1 0"] {
            assert!(validate_version(v).is_err(), "{v:?} should be rejected");
        }
    }

    #[test]
    fn overlong_version_is_rejected() {
        let v = "1".repeat(MAX_VERSION_LEN + 1);
        assert!(validate_version(&v).is_err());
        assert!(validate_version(&"1".repeat(MAX_VERSION_LEN)).is_ok());
    }

    #[test]
    fn min_version_is_optional() {
        assert!(validate_min_version(None).is_ok());
        assert!(validate_min_version(Some("1.0.0")).is_ok());
        assert!(validate_min_version(Some("../x")).is_err());
    }

    #[test]
    fn rollout_bounds() {
        assert!(validate_rollout_percent(0).is_ok());
        assert!(validate_rollout_percent(100).is_ok());
        assert!(validate_rollout_percent(-1).is_err());
        assert!(validate_rollout_percent(101).is_err());
    }

    #[test]
    fn artifact_size_bounds() {
        assert!(validate_artifact_size(1024, 1024).is_ok());
        assert!(validate_artifact_size(1025, 1024).is_err());
        assert!(validate_artifact_size(0, 1024).is_err());
    }

    #[test]
    fn only_bin_extension_is_accepted() {
        assert!(validate_artifact_extension("fw.bin").is_ok());
        assert!(validate_artifact_extension("FW.BIN").is_ok());
        assert!(validate_artifact_extension("fw.hex").is_err());
        assert!(validate_artifact_extension("fw.bin.zip").is_err());
    }

    #[test]
    fn filename_is_deterministic() {
        assert_eq!(firmware_filename("1.0.4"), "esp32p4_v1.0.4.bin");
        assert_eq!(firmware_filename("1.0.4"), firmware_filename("1.0.4"));
    }

    #[test]
    fn download_url_trims_trailing_slash() {
        assert_eq!(
            download_url("https://ota.example.com/"),
            "https://ota.example.com/api/firmware/download"
        );
        assert_eq!(
            download_url("http://localhost:8000"),
            "http://localhost:8000/api/firmware/download"
        );
    }

    #[test]
    fn report_status_round_trips_through_str() {
        for s in ["success", "failed", "in_progress"] {
            assert_eq!(s.parse::<ReportStatus>().unwrap().as_str(), s);
        }
        assert!("done".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn report_status_serde_is_snake_case() {
        let json = serde_json::to_string(&ReportStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn report_identity_rules() {
        assert!(validate_report_identity("dev-1", "1.0.4").is_ok());
        assert!(validate_report_identity("", "1.0.4").is_err());
        assert!(validate_report_identity("dev-1", " ").is_err());
        assert!(validate_report_identity(&"d".repeat(101), "1.0").is_err());
    }

    #[test]
    fn progress_bounds() {
        assert!(validate_progress_percent(None).is_ok());
        assert!(validate_progress_percent(Some(0)).is_ok());
        assert!(validate_progress_percent(Some(100)).is_ok());
        assert!(validate_progress_percent(Some(101)).is_err());
        assert!(validate_progress_percent(Some(-5)).is_err());
    }

    #[test]
    fn long_error_messages_are_truncated() {
        let long = "x".repeat(600);
        let truncated = truncate_error_message(Some(long)).unwrap();
        assert_eq!(truncated.len(), MAX_ERROR_MESSAGE_LEN);
        assert_eq!(truncate_error_message(None), None);
    }

    #[test]
    fn report_limit_is_bounded() {
        assert_eq!(clamp_report_limit(None), DEFAULT_REPORT_LIMIT);
        assert_eq!(clamp_report_limit(Some(0)), 1);
        assert_eq!(clamp_report_limit(Some(5000)), MAX_REPORT_LIMIT);
        assert_eq!(clamp_report_limit(Some(1)), 1);
    }
}
