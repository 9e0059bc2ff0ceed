//! Firmware catalog models and DTOs.
//!
//! Maps to the `firmware_metadata` table.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use orolexa_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `firmware_metadata` table.
///
/// `version`, `filename`, `checksum` and `file_size` never change after
/// insert; [`UpdateFirmwareMetadata`] has no fields for them.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct FirmwareMetadata {
    pub id: DbId,
    pub version: String,
    pub filename: String,
    pub checksum: String,
    pub file_size: i64,
    pub url: String,
    pub release_notes: Option<String>,
    pub rollout_percent: i32,
    pub is_active: bool,
    pub min_version: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for inserting a catalog row. Checksum and size are computed by the
/// registry from the artifact bytes, never taken from a client.
#[derive(Debug, Clone)]
pub struct CreateFirmwareMetadata {
    pub id: DbId,
    pub version: String,
    pub filename: String,
    pub checksum: String,
    pub file_size: i64,
    pub url: String,
    pub release_notes: Option<String>,
    pub rollout_percent: i32,
    pub min_version: Option<String>,
    pub uploaded_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// DTO for updating the mutable fields of a catalog row. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFirmwareMetadata {
    pub is_active: Option<bool>,
    pub rollout_percent: Option<i32>,
    pub release_notes: Option<String>,
}

impl UpdateFirmwareMetadata {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.rollout_percent.is_none() && self.release_notes.is_none()
    }
}
