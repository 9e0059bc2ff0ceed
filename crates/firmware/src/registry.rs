//! Firmware registry: publish rules and catalog queries.
//!
//! A publish validates everything it can before touching disk, stages the
//! catalog row inside a transaction, writes the artifact, and only then
//! commits. A failed commit removes the artifact again.

use std::sync::Arc;

use orolexa_core::artifact_store::ArtifactStore;
use orolexa_core::error::CoreError;
use orolexa_core::firmware::{
    download_url, firmware_filename, validate_artifact_size, validate_min_version,
    validate_rollout_percent, validate_version, DEFAULT_ROLLOUT_PERCENT,
};
use orolexa_core::pagination::{clamp_limit, clamp_offset};
use orolexa_core::types::new_id;
use orolexa_db::models::firmware::{CreateFirmwareMetadata, FirmwareMetadata, UpdateFirmwareMetadata};

use crate::catalog::{duplicate_version_error, FirmwareCatalog};
use crate::error::{OtaError, OtaResult};

/// Default page size for catalog listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Upper bound on a catalog listing page.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Registry settings resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct FirmwareSettings {
    pub max_artifact_bytes: usize,
    /// Public base URL the download URL is derived from.
    pub base_url: String,
}

/// Input for [`FirmwareRegistry::publish`].
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub version: String,
    pub data: Vec<u8>,
    pub release_notes: Option<String>,
    /// Defaults to [`DEFAULT_ROLLOUT_PERCENT`] when absent.
    pub rollout_percent: Option<i32>,
    pub min_version: Option<String>,
    pub uploaded_by: Option<String>,
}

/// Catalog plus artifact store under the publish invariants.
pub struct FirmwareRegistry {
    catalog: Arc<dyn FirmwareCatalog>,
    store: ArtifactStore,
    settings: FirmwareSettings,
}

impl FirmwareRegistry {
    pub fn new(
        catalog: Arc<dyn FirmwareCatalog>,
        store: ArtifactStore,
        settings: FirmwareSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Publish a new firmware version.
    ///
    /// Returns the committed row. Validation failures and duplicate
    /// versions are rejected before any artifact I/O.
    pub async fn publish(&self, req: PublishRequest) -> OtaResult<FirmwareMetadata> {
        validate_artifact_size(req.data.len(), self.settings.max_artifact_bytes)?;
        validate_version(&req.version)?;
        validate_min_version(req.min_version.as_deref())?;

        if self.catalog.find_by_version(&req.version).await?.is_some() {
            tracing::info!(version = %req.version, "Rejected duplicate firmware version");
            return Err(duplicate_version_error(&req.version).into());
        }

        let rollout_percent = req.rollout_percent.unwrap_or(DEFAULT_ROLLOUT_PERCENT);
        validate_rollout_percent(rollout_percent)?;

        let filename = firmware_filename(&req.version);
        let input = CreateFirmwareMetadata {
            id: new_id(),
            version: req.version.clone(),
            filename: filename.clone(),
            checksum: ArtifactStore::compute_digest(&req.data),
            file_size: req.data.len() as i64,
            url: download_url(&self.settings.base_url),
            release_notes: req.release_notes,
            rollout_percent,
            min_version: req.min_version,
            uploaded_by: req.uploaded_by,
        };

        // A concurrent publisher of the same version loses here, before it
        // can touch the winner's file.
        let staged = self.catalog.stage(&input).await?;

        if let Err(e) = self.store.store(&filename, &req.data).await {
            tracing::error!(version = %req.version, error = %e, "Failed to store firmware artifact");
            drop(staged);
            return Err(OtaError::Storage(e));
        }

        match staged.commit().await {
            Ok(row) => {
                tracing::info!(
                    version = %row.version,
                    size = row.file_size,
                    checksum = %row.checksum,
                    "Firmware published",
                );
                Ok(row)
            }
            Err(e) => {
                tracing::error!(version = %req.version, error = %e, "Failed to commit firmware metadata");
                match self.store.remove(&filename).await {
                    Ok(()) => tracing::warn!(filename, "Removed artifact after commit failure"),
                    Err(cleanup) => tracing::error!(
                        filename,
                        error = %cleanup,
                        "Failed to remove artifact after commit failure",
                    ),
                }
                Err(e)
            }
        }
    }

    /// Most recently published active version.
    pub async fn get_latest_active(&self) -> OtaResult<Option<FirmwareMetadata>> {
        self.catalog.find_latest_active().await
    }

    pub async fn get_by_version(&self, version: &str) -> OtaResult<Option<FirmwareMetadata>> {
        self.catalog.find_by_version(version).await
    }

    /// Catalog rows, newest first.
    pub async fn list(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> OtaResult<Vec<FirmwareMetadata>> {
        let limit = clamp_limit(limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        self.catalog.list(limit, clamp_offset(offset)).await
    }

    /// Change the mutable fields of a row (active flag, rollout, notes).
    pub async fn update(
        &self,
        version: &str,
        input: UpdateFirmwareMetadata,
    ) -> OtaResult<FirmwareMetadata> {
        if input.is_empty() {
            return Err(CoreError::Validation("No fields to update".into()).into());
        }
        if let Some(percent) = input.rollout_percent {
            validate_rollout_percent(percent)?;
        }

        let row = self
            .catalog
            .update(version, &input)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Firmware",
                key: version.to_string(),
            })?;

        tracing::info!(
            version = %row.version,
            is_active = row.is_active,
            rollout_percent = row.rollout_percent,
            "Firmware updated",
        );
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
