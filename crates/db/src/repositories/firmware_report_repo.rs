//! Repository for the `firmware_reports` table.

use sqlx::PgPool;

use crate::models::firmware_report::{CreateFirmwareReport, FirmwareReport, ReportFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, device_id, firmware_version, status, error_message, \
    progress_percent, ip_address, reported_at";

/// Append and query device OTA reports. There are no update or delete
/// methods: the table is an audit log.
pub struct FirmwareReportRepo;

impl FirmwareReportRepo {
    /// Insert a report. `reported_at` is assigned by the database.
    pub async fn create(
        pool: &PgPool,
        input: &CreateFirmwareReport,
    ) -> Result<FirmwareReport, sqlx::Error> {
        let query = format!(
            "INSERT INTO firmware_reports
                (id, device_id, firmware_version, status, error_message,
                 progress_percent, ip_address)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FirmwareReport>(&query)
            .bind(input.id)
            .bind(&input.device_id)
            .bind(&input.firmware_version)
            .bind(input.status.as_str())
            .bind(&input.error_message)
            .bind(input.progress_percent)
            .bind(&input.ip_address)
            .fetch_one(pool)
            .await
    }

    /// List reports matching every given filter, most recent first.
    pub async fn list(
        pool: &PgPool,
        filter: &ReportFilter,
        limit: i64,
    ) -> Result<Vec<FirmwareReport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM firmware_reports
             WHERE ($1::TEXT IS NULL OR device_id = $1)
               AND ($2::TEXT IS NULL OR firmware_version = $2)
             ORDER BY reported_at DESC, id DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, FirmwareReport>(&query)
            .bind(&filter.device_id)
            .bind(&filter.firmware_version)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
