//! Query parameter types for API handlers.

use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the registry via `clamp_limit` / `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Filters for `GET /reports`. Blank values are ignored.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub device_id: Option<String>,
    pub firmware_version: Option<String>,
    pub limit: Option<i64>,
}
