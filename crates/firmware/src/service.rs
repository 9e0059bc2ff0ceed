//! OTA service: the single entry point HTTP handlers call into.
//!
//! Wires the registry, the report collector and the notifier together.
//! Notification after a publish is best effort. Report ingestion never
//! surfaces infrastructure faults to the device.

use std::path::PathBuf;
use std::sync::Arc;

use orolexa_core::artifact_store::ArtifactStore;
use orolexa_core::error::CoreError;
use orolexa_db::models::firmware::{FirmwareMetadata, UpdateFirmwareMetadata};
use orolexa_db::models::firmware_report::{FirmwareReport, ReportFilter};
use orolexa_events::FirmwareNotifier;

use crate::catalog::FirmwareCatalog;
use crate::collector::{NewReport, ReportCollector};
use crate::error::OtaResult;
use crate::registry::{FirmwareRegistry, FirmwareSettings, PublishRequest};
use crate::report_log::ReportLog;

/// A servable artifact: its catalog row and the verified on-disk path.
#[derive(Debug, Clone)]
pub struct FirmwareDownload {
    pub metadata: FirmwareMetadata,
    pub path: PathBuf,
}

pub struct OtaService {
    registry: FirmwareRegistry,
    collector: ReportCollector,
    notifier: Arc<dyn FirmwareNotifier>,
}

impl OtaService {
    pub fn new(
        catalog: Arc<dyn FirmwareCatalog>,
        report_log: Arc<dyn ReportLog>,
        store: ArtifactStore,
        notifier: Arc<dyn FirmwareNotifier>,
        settings: FirmwareSettings,
    ) -> Self {
        Self {
            registry: FirmwareRegistry::new(catalog, store, settings),
            collector: ReportCollector::new(report_log),
            notifier,
        }
    }

    // -----------------------------------------------------------------------
    // Catalog reads
    // -----------------------------------------------------------------------

    pub async fn get_latest_firmware(&self) -> OtaResult<Option<FirmwareMetadata>> {
        self.registry.get_latest_active().await
    }

    pub async fn get_firmware_by_version(
        &self,
        version: &str,
    ) -> OtaResult<Option<FirmwareMetadata>> {
        self.registry.get_by_version(version).await
    }

    pub async fn list_firmware(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> OtaResult<Vec<FirmwareMetadata>> {
        self.registry.list(limit, offset).await
    }

    /// On-disk path of a stored artifact, if it exists.
    pub async fn get_firmware_file_path(&self, filename: &str) -> Option<PathBuf> {
        self.registry.store().resolve_path(filename).await
    }

    // -----------------------------------------------------------------------
    // Downloads
    // -----------------------------------------------------------------------

    /// The latest active artifact, verified against its catalog row.
    pub async fn open_latest_artifact(&self) -> OtaResult<FirmwareDownload> {
        let metadata = self
            .registry
            .get_latest_active()
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Firmware",
                key: "latest".into(),
            })?;
        self.verified_download(metadata).await
    }

    /// A specific version's artifact, active or not.
    pub async fn open_artifact(&self, version: &str) -> OtaResult<FirmwareDownload> {
        let metadata = self
            .registry
            .get_by_version(version)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Firmware",
                key: version.to_string(),
            })?;
        self.verified_download(metadata).await
    }

    async fn verified_download(&self, metadata: FirmwareMetadata) -> OtaResult<FirmwareDownload> {
        let store = self.registry.store();
        let on_disk = store.file_len(&metadata.filename).await;
        let path = match on_disk {
            Some(len) if len == metadata.file_size as u64 => {
                store.resolve_path(&metadata.filename).await
            }
            _ => None,
        };

        match path {
            Some(path) => Ok(FirmwareDownload { metadata, path }),
            None => {
                tracing::error!(
                    version = %metadata.version,
                    filename = %metadata.filename,
                    expected_size = metadata.file_size,
                    actual_size = ?on_disk,
                    "Firmware artifact missing on disk",
                );
                Err(CoreError::ArtifactMissing {
                    filename: metadata.filename,
                }
                .into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    /// Publish a version, then announce it in the background.
    ///
    /// Returns once the row is committed. The announcement runs on a
    /// spawned task and its failure is only logged.
    pub async fn upload_firmware(&self, req: PublishRequest) -> OtaResult<FirmwareMetadata> {
        let row = self.registry.publish(req).await?;

        let notifier = Arc::clone(&self.notifier);
        let version = row.version.clone();
        let release_notes = row.release_notes.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier
                .notify_firmware_available(&version, release_notes.as_deref())
                .await
            {
                tracing::warn!(version, error = %e, "Firmware notification failed");
            }
        });
        Ok(row)
    }

    pub async fn update_firmware(
        &self,
        version: &str,
        input: UpdateFirmwareMetadata,
    ) -> OtaResult<FirmwareMetadata> {
        self.registry.update(version, input).await
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Record a device report.
    ///
    /// Only validation failures are returned as errors. Storage faults are
    /// logged and yield `Ok(None)` so a device is never told to retry.
    pub async fn report_ota_status(&self, report: NewReport) -> OtaResult<Option<FirmwareReport>> {
        let device_id = report.device_id.clone();
        match self.collector.record(report).await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_validation() => Err(e),
            Err(e) => {
                tracing::error!(device_id, error = %e, "Failed to record OTA report");
                Ok(None)
            }
        }
    }

    /// Reports matching `filter`; an empty list when the log is unreadable.
    pub async fn get_ota_reports(
        &self,
        filter: ReportFilter,
        limit: Option<i64>,
    ) -> Vec<FirmwareReport> {
        self.collector
            .query(filter, limit)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to query OTA reports");
                Vec::new()
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
