//! Device OTA report collection.
//!
//! Reports are an append-only log. The reported version is not checked
//! against the catalog.

use std::sync::Arc;

use orolexa_core::firmware::{
    clamp_report_limit, truncate_error_message, validate_progress_percent,
    validate_report_identity, ReportStatus,
};
use orolexa_core::types::new_id;
use orolexa_db::models::firmware_report::{CreateFirmwareReport, FirmwareReport, ReportFilter};

use crate::error::OtaResult;
use crate::report_log::ReportLog;

/// A status report as received from a device.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub device_id: String,
    pub firmware_version: String,
    pub status: ReportStatus,
    pub error_message: Option<String>,
    pub progress_percent: Option<i32>,
    pub ip_address: Option<String>,
}

pub struct ReportCollector {
    log: Arc<dyn ReportLog>,
}

impl ReportCollector {
    pub fn new(log: Arc<dyn ReportLog>) -> Self {
        Self { log }
    }

    /// Validate and append a report. The log assigns `reported_at`.
    pub async fn record(&self, report: NewReport) -> OtaResult<FirmwareReport> {
        validate_report_identity(&report.device_id, &report.firmware_version)?;
        validate_progress_percent(report.progress_percent)?;

        let input = CreateFirmwareReport {
            id: new_id(),
            device_id: report.device_id,
            firmware_version: report.firmware_version,
            status: report.status,
            error_message: truncate_error_message(report.error_message),
            progress_percent: report.progress_percent,
            ip_address: report.ip_address,
        };
        let row = self.log.append(&input).await?;

        tracing::info!(
            device_id = %row.device_id,
            firmware_version = %row.firmware_version,
            status = %row.status,
            "OTA report recorded",
        );
        Ok(row)
    }

    /// Reports matching `filter`, most recent first.
    ///
    /// Blank filter values are ignored and the limit is clamped.
    pub async fn query(
        &self,
        filter: ReportFilter,
        limit: Option<i64>,
    ) -> OtaResult<Vec<FirmwareReport>> {
        let filter = ReportFilter {
            device_id: non_blank(filter.device_id),
            firmware_version: non_blank(filter.firmware_version),
        };
        self.log.list(&filter, clamp_report_limit(limit)).await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use orolexa_core::firmware::MAX_ERROR_MESSAGE_LEN;

    use super::*;
    use crate::testing::MemoryReportLog;

    fn report(device: &str, version: &str, status: ReportStatus) -> NewReport {
        NewReport {
            device_id: device.into(),
            firmware_version: version.into(),
            status,
            error_message: None,
            progress_percent: None,
            ip_address: Some("10.0.0.7".into()),
        }
    }

    fn collector() -> (Arc<MemoryReportLog>, ReportCollector) {
        let log = Arc::new(MemoryReportLog::default());
        (log.clone(), ReportCollector::new(log))
    }

    #[tokio::test]
    async fn records_reports_for_unknown_versions() {
        let (log, collector) = collector();

        let row = collector
            .record(report("dev-1", "0.0.1-unpublished", ReportStatus::Success))
            .await
            .unwrap();

        assert_eq!(row.status, "success");
        assert_eq!(row.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_reports_without_appending() {
        let (log, collector) = collector();

        let mut bad_progress = report("dev-1", "1.0.0", ReportStatus::InProgress);
        bad_progress.progress_percent = Some(120);
        assert!(collector.record(bad_progress).await.unwrap_err().is_validation());

        let blank_device = report(" ", "1.0.0", ReportStatus::Failed);
        assert!(collector.record(blank_device).await.unwrap_err().is_validation());

        assert_eq!(log.len(), 0);
    }

    #[tokio::test]
    async fn truncates_long_error_messages() {
        let (_, collector) = collector();
        let mut failed = report("dev-1", "1.0.0", ReportStatus::Failed);
        failed.error_message = Some("e".repeat(MAX_ERROR_MESSAGE_LEN * 2));

        let row = collector.record(failed).await.unwrap();
        assert_eq!(
            row.error_message.unwrap().chars().count(),
            MAX_ERROR_MESSAGE_LEN
        );
    }

    #[tokio::test]
    async fn query_filters_and_limits() {
        let (_, collector) = collector();
        collector
            .record(report("dev-1", "1.0.0", ReportStatus::InProgress))
            .await
            .unwrap();
        collector
            .record(report("dev-1", "1.0.0", ReportStatus::Success))
            .await
            .unwrap();
        collector
            .record(report("dev-2", "1.0.0", ReportStatus::Failed))
            .await
            .unwrap();

        let dev1 = ReportFilter {
            device_id: Some("dev-1".into()),
            ..Default::default()
        };
        let rows = collector.query(dev1.clone(), None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.device_id == "dev-1"));

        let newest = collector.query(dev1, Some(1)).await.unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].status, "success");

        let blank = ReportFilter {
            device_id: Some(String::new()),
            firmware_version: Some("1.0.0".into()),
        };
        assert_eq!(collector.query(blank, None).await.unwrap().len(), 3);
    }
}
