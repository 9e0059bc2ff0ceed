//! Storage seam for device OTA reports.

use async_trait::async_trait;
use orolexa_db::models::firmware_report::{CreateFirmwareReport, FirmwareReport, ReportFilter};
use orolexa_db::repositories::FirmwareReportRepo;
use orolexa_db::DbPool;

use crate::error::OtaResult;

/// Append-only report storage with filtered reads.
#[async_trait]
pub trait ReportLog: Send + Sync {
    /// Insert a report; the store assigns `reported_at`.
    async fn append(&self, input: &CreateFirmwareReport) -> OtaResult<FirmwareReport>;

    /// Reports matching every filter, most recent first, at most `limit`.
    async fn list(&self, filter: &ReportFilter, limit: i64) -> OtaResult<Vec<FirmwareReport>>;
}

/// [`ReportLog`] backed by the `firmware_reports` table.
#[derive(Clone)]
pub struct PgReportLog {
    pool: DbPool,
}

impl PgReportLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportLog for PgReportLog {
    async fn append(&self, input: &CreateFirmwareReport) -> OtaResult<FirmwareReport> {
        Ok(FirmwareReportRepo::create(&self.pool, input).await?)
    }

    async fn list(&self, filter: &ReportFilter, limit: i64) -> OtaResult<Vec<FirmwareReport>> {
        Ok(FirmwareReportRepo::list(&self.pool, filter, limit).await?)
    }
}
