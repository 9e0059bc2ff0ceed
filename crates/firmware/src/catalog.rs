//! Catalog seam for firmware metadata.
//!
//! Publishing stages a row inside a transaction, writes the artifact, then
//! commits. [`StagedFirmware`] represents the uncommitted row; dropping it
//! without calling [`StagedFirmware::commit`] discards the insert.

use async_trait::async_trait;
use orolexa_core::error::CoreError;
use orolexa_db::models::firmware::{CreateFirmwareMetadata, FirmwareMetadata, UpdateFirmwareMetadata};
use orolexa_db::repositories::firmware_repo::is_duplicate_version;
use orolexa_db::repositories::FirmwareRepo;
use orolexa_db::DbPool;
use sqlx::{Postgres, Transaction};

use crate::error::OtaResult;

/// Read and write access to the firmware catalog.
#[async_trait]
pub trait FirmwareCatalog: Send + Sync {
    async fn find_by_version(&self, version: &str) -> OtaResult<Option<FirmwareMetadata>>;

    async fn find_latest_active(&self) -> OtaResult<Option<FirmwareMetadata>>;

    async fn list(&self, limit: i64, offset: i64) -> OtaResult<Vec<FirmwareMetadata>>;

    /// Insert a row without committing it. A duplicate version fails with
    /// `CoreError::Conflict`.
    async fn stage(&self, input: &CreateFirmwareMetadata) -> OtaResult<Box<dyn StagedFirmware>>;

    async fn update(
        &self,
        version: &str,
        input: &UpdateFirmwareMetadata,
    ) -> OtaResult<Option<FirmwareMetadata>>;
}

/// An inserted but uncommitted catalog row.
#[async_trait]
pub trait StagedFirmware: Send {
    fn metadata(&self) -> &FirmwareMetadata;

    async fn commit(self: Box<Self>) -> OtaResult<FirmwareMetadata>;
}

/// Error returned when `version` is already in the catalog.
pub(crate) fn duplicate_version_error(version: &str) -> CoreError {
    CoreError::Conflict(format!("Firmware version {version} already exists"))
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// [`FirmwareCatalog`] backed by the `firmware_metadata` table.
#[derive(Clone)]
pub struct PgFirmwareCatalog {
    pool: DbPool,
}

impl PgFirmwareCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FirmwareCatalog for PgFirmwareCatalog {
    async fn find_by_version(&self, version: &str) -> OtaResult<Option<FirmwareMetadata>> {
        Ok(FirmwareRepo::find_by_version(&self.pool, version).await?)
    }

    async fn find_latest_active(&self) -> OtaResult<Option<FirmwareMetadata>> {
        Ok(FirmwareRepo::find_latest_active(&self.pool).await?)
    }

    async fn list(&self, limit: i64, offset: i64) -> OtaResult<Vec<FirmwareMetadata>> {
        Ok(FirmwareRepo::list(&self.pool, limit, offset).await?)
    }

    async fn stage(&self, input: &CreateFirmwareMetadata) -> OtaResult<Box<dyn StagedFirmware>> {
        let mut tx = self.pool.begin().await?;
        let row = match FirmwareRepo::insert_in_tx(&mut tx, input).await {
            Ok(row) => row,
            Err(e) if is_duplicate_version(&e) => {
                return Err(duplicate_version_error(&input.version).into())
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Box::new(PgStagedFirmware { tx, row }))
    }

    async fn update(
        &self,
        version: &str,
        input: &UpdateFirmwareMetadata,
    ) -> OtaResult<Option<FirmwareMetadata>> {
        Ok(FirmwareRepo::update(&self.pool, version, input).await?)
    }
}

/// Row inserted inside an open Postgres transaction.
struct PgStagedFirmware {
    tx: Transaction<'static, Postgres>,
    row: FirmwareMetadata,
}

#[async_trait]
impl StagedFirmware for PgStagedFirmware {
    fn metadata(&self) -> &FirmwareMetadata {
        &self.row
    }

    async fn commit(self: Box<Self>) -> OtaResult<FirmwareMetadata> {
        let PgStagedFirmware { tx, row } = *self;
        tx.commit().await?;
        Ok(row)
    }
}
