//! OTA status report models and DTOs.
//!
//! Maps to the `firmware_reports` table. Rows are append-only.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use orolexa_core::firmware::ReportStatus;
use orolexa_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `firmware_reports` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct FirmwareReport {
    pub id: DbId,
    pub device_id: String,
    pub firmware_version: String,
    pub status: String,
    pub error_message: Option<String>,
    pub progress_percent: Option<i32>,
    pub ip_address: Option<String>,
    /// Assigned by the database at insert time.
    pub reported_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for inserting a report. The database assigns `reported_at`.
#[derive(Debug, Clone)]
pub struct CreateFirmwareReport {
    pub id: DbId,
    pub device_id: String,
    pub firmware_version: String,
    pub status: ReportStatus,
    pub error_message: Option<String>,
    pub progress_percent: Option<i32>,
    pub ip_address: Option<String>,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Optional report filters, combined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub device_id: Option<String>,
    pub firmware_version: Option<String>,
}
