//! In-memory catalog, report log and notifier with failure injection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use orolexa_db::models::firmware::{CreateFirmwareMetadata, FirmwareMetadata, UpdateFirmwareMetadata};
use orolexa_db::models::firmware_report::{CreateFirmwareReport, FirmwareReport, ReportFilter};
use orolexa_events::{FirmwareNotifier, NotifyError};

use crate::catalog::{duplicate_version_error, FirmwareCatalog, StagedFirmware};
use crate::error::OtaResult;
use crate::report_log::ReportLog;

fn db_fault() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

type CommitHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct MemoryCatalog {
    rows: Arc<Mutex<Vec<FirmwareMetadata>>>,
    pub fail_commit: Arc<AtomicBool>,
    pub fail_reads: AtomicBool,
    before_commit: Mutex<Option<CommitHook>>,
}

impl MemoryCatalog {
    /// Run `hook` at the start of every later commit, after the artifact
    /// has been written.
    pub fn on_commit(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.before_commit.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn rows(&self) -> Vec<FirmwareMetadata> {
        self.rows.lock().unwrap().clone()
    }

    pub fn set_active(&self, version: &str, active: bool) {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut().filter(|r| r.version == version) {
            row.is_active = active;
        }
    }

    fn check_reads(&self) -> OtaResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(db_fault().into());
        }
        Ok(())
    }
}

#[async_trait]
impl FirmwareCatalog for MemoryCatalog {
    async fn find_by_version(&self, version: &str) -> OtaResult<Option<FirmwareMetadata>> {
        self.check_reads()?;
        Ok(self.rows().into_iter().find(|r| r.version == version))
    }

    async fn find_latest_active(&self) -> OtaResult<Option<FirmwareMetadata>> {
        self.check_reads()?;
        Ok(self
            .rows()
            .into_iter()
            .filter(|r| r.is_active)
            .max_by_key(|r| (r.created_at, r.id)))
    }

    async fn list(&self, limit: i64, offset: i64) -> OtaResult<Vec<FirmwareMetadata>> {
        self.check_reads()?;
        let mut rows = self.rows();
        rows.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.id)));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn stage(&self, input: &CreateFirmwareMetadata) -> OtaResult<Box<dyn StagedFirmware>> {
        if self.rows().iter().any(|r| r.version == input.version) {
            return Err(duplicate_version_error(&input.version).into());
        }
        let now = Utc::now();
        let row = FirmwareMetadata {
            id: input.id,
            version: input.version.clone(),
            filename: input.filename.clone(),
            checksum: input.checksum.clone(),
            file_size: input.file_size,
            url: input.url.clone(),
            release_notes: input.release_notes.clone(),
            rollout_percent: input.rollout_percent,
            is_active: true,
            min_version: input.min_version.clone(),
            uploaded_by: input.uploaded_by.clone(),
            created_at: now,
            updated_at: now,
        };
        Ok(Box::new(MemoryStaged {
            rows: Arc::clone(&self.rows),
            fail_commit: self.fail_commit.load(Ordering::SeqCst),
            before_commit: self.before_commit.lock().unwrap().clone(),
            row,
        }))
    }

    async fn update(
        &self,
        version: &str,
        input: &UpdateFirmwareMetadata,
    ) -> OtaResult<Option<FirmwareMetadata>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.version == version) else {
            return Ok(None);
        };
        if let Some(active) = input.is_active {
            row.is_active = active;
        }
        if let Some(percent) = input.rollout_percent {
            row.rollout_percent = percent;
        }
        if let Some(notes) = &input.release_notes {
            row.release_notes = Some(notes.clone());
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }
}

struct MemoryStaged {
    rows: Arc<Mutex<Vec<FirmwareMetadata>>>,
    fail_commit: bool,
    before_commit: Option<CommitHook>,
    row: FirmwareMetadata,
}

#[async_trait]
impl StagedFirmware for MemoryStaged {
    fn metadata(&self) -> &FirmwareMetadata {
        &self.row
    }

    async fn commit(self: Box<Self>) -> OtaResult<FirmwareMetadata> {
        if let Some(hook) = &self.before_commit {
            hook();
        }
        if self.fail_commit {
            return Err(db_fault().into());
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.version == self.row.version) {
            return Err(duplicate_version_error(&self.row.version).into());
        }
        rows.push(self.row.clone());
        Ok(self.row.clone())
    }
}

// ---------------------------------------------------------------------------
// Report log
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryReportLog {
    rows: Mutex<Vec<FirmwareReport>>,
    pub fail: AtomicBool,
}

impl MemoryReportLog {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ReportLog for MemoryReportLog {
    async fn append(&self, input: &CreateFirmwareReport) -> OtaResult<FirmwareReport> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(db_fault().into());
        }
        let report = FirmwareReport {
            id: input.id,
            device_id: input.device_id.clone(),
            firmware_version: input.firmware_version.clone(),
            status: input.status.as_str().to_string(),
            error_message: input.error_message.clone(),
            progress_percent: input.progress_percent,
            ip_address: input.ip_address.clone(),
            reported_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(report.clone());
        Ok(report)
    }

    async fn list(&self, filter: &ReportFilter, limit: i64) -> OtaResult<Vec<FirmwareReport>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(db_fault().into());
        }
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.device_id.as_ref().is_none_or(|d| &r.device_id == d))
            .filter(|r| {
                filter
                    .firmware_version
                    .as_ref()
                    .is_none_or(|v| &r.firmware_version == v)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse((r.reported_at, r.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<(String, Option<String>)>>,
    pub fail: bool,
    /// Record the call, then never complete.
    pub stall: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn stalled() -> Self {
        Self {
            stall: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Poll until at least `n` calls are recorded; announcements run on
    /// spawned tasks.
    pub async fn wait_for_calls(&self, n: usize) -> Vec<(String, Option<String>)> {
        for _ in 0..200 {
            let calls = self.calls();
            if calls.len() >= n {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} notifier calls, got {:?}", self.calls());
    }
}

#[async_trait]
impl FirmwareNotifier for RecordingNotifier {
    async fn notify_firmware_available(
        &self,
        version: &str,
        release_notes: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push((version.to_string(), release_notes.map(str::to_string)));
        if self.stall {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(NotifyError::HttpStatus(503));
        }
        Ok(())
    }
}
