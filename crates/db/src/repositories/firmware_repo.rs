//! Repository for the `firmware_metadata` table.

use sqlx::{PgPool, Postgres, Transaction};

use crate::models::firmware::{CreateFirmwareMetadata, FirmwareMetadata, UpdateFirmwareMetadata};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, version, filename, checksum, file_size, url, release_notes, \
    rollout_percent, is_active, min_version, uploaded_by, created_at, updated_at";

/// Name of the unique constraint guarding `version`.
pub const VERSION_UNIQUE_CONSTRAINT: &str = "uq_firmware_metadata_version";

/// Provides catalog reads and writes for published firmware.
pub struct FirmwareRepo;

impl FirmwareRepo {
    /// Insert a catalog row in its own transaction. Returns the created row.
    ///
    /// Used for seeding and repository tests. Publishing calls
    /// [`Self::insert_in_tx`] so the artifact is written while the row is
    /// still uncommitted.
    pub async fn create(
        pool: &PgPool,
        input: &CreateFirmwareMetadata,
    ) -> Result<FirmwareMetadata, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let row = Self::insert_in_tx(&mut tx, input).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Insert a catalog row inside a caller-owned transaction.
    ///
    /// The unique constraint on `version` makes a concurrent insert of the
    /// same version block until this transaction ends, then fail with a
    /// unique violation if it committed.
    pub async fn insert_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateFirmwareMetadata,
    ) -> Result<FirmwareMetadata, sqlx::Error> {
        let query = format!(
            "INSERT INTO firmware_metadata
                (id, version, filename, checksum, file_size, url, release_notes,
                 rollout_percent, is_active, min_version, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FirmwareMetadata>(&query)
            .bind(input.id)
            .bind(&input.version)
            .bind(&input.filename)
            .bind(&input.checksum)
            .bind(input.file_size)
            .bind(&input.url)
            .bind(&input.release_notes)
            .bind(input.rollout_percent)
            .bind(&input.min_version)
            .bind(&input.uploaded_by)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a catalog row by exact version.
    pub async fn find_by_version(
        pool: &PgPool,
        version: &str,
    ) -> Result<Option<FirmwareMetadata>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM firmware_metadata WHERE version = $1");
        sqlx::query_as::<_, FirmwareMetadata>(&query)
            .bind(version)
            .fetch_optional(pool)
            .await
    }

    /// Most recently created active row. Ties on `created_at` fall back to
    /// the time-ordered id so the answer is stable across calls.
    pub async fn find_latest_active(pool: &PgPool) -> Result<Option<FirmwareMetadata>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM firmware_metadata
             WHERE is_active = TRUE
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, FirmwareMetadata>(&query)
            .fetch_optional(pool)
            .await
    }

    /// List catalog rows, newest first.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FirmwareMetadata>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM firmware_metadata
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, FirmwareMetadata>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update the mutable fields of a row. Returns `None` if the version
    /// does not exist.
    pub async fn update(
        pool: &PgPool,
        version: &str,
        input: &UpdateFirmwareMetadata,
    ) -> Result<Option<FirmwareMetadata>, sqlx::Error> {
        let query = format!(
            "UPDATE firmware_metadata SET
                is_active = COALESCE($2, is_active),
                rollout_percent = COALESCE($3, rollout_percent),
                release_notes = COALESCE($4, release_notes),
                updated_at = NOW()
             WHERE version = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FirmwareMetadata>(&query)
            .bind(version)
            .bind(input.is_active)
            .bind(input.rollout_percent)
            .bind(&input.release_notes)
            .fetch_optional(pool)
            .await
    }
}

/// True when `err` is a unique violation on the version constraint.
pub fn is_duplicate_version(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(VERSION_UNIQUE_CONSTRAINT)
        }
        _ => false,
    }
}
