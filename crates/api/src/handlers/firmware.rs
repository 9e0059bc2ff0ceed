//! Handlers for firmware distribution and OTA status reporting.
//!
//! Device-facing endpoints (`/latest`, `/download`, `/report`) are
//! unauthenticated. Publishing and catalog management require admin
//! Basic credentials.

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use orolexa_core::error::CoreError;
use orolexa_core::firmware::{validate_artifact_extension, ReportStatus};
use orolexa_db::models::firmware::UpdateFirmwareMetadata;
use orolexa_db::models::firmware_report::{FirmwareReport, ReportFilter};
use orolexa_firmware::{FirmwareDownload, NewReport, PublishRequest};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::admin::RequireAdmin;
use crate::middleware::client_ip::ClientIp;
use crate::query::{PaginationParams, ReportQuery};
use crate::response::{DataResponse, StatusResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /api/firmware/latest
// ---------------------------------------------------------------------------

/// Metadata of the latest active firmware.
pub async fn get_latest(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let firmware = state
        .ota
        .get_latest_firmware()
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Firmware",
            key: "latest".into(),
        })?;
    Ok(Json(firmware))
}

// ---------------------------------------------------------------------------
// GET /api/firmware/download
// GET /api/firmware/download/{version}
// ---------------------------------------------------------------------------

/// Stream the latest active artifact.
pub async fn download_latest(State(state): State<AppState>) -> AppResult<Response> {
    let download = state.ota.open_latest_artifact().await?;
    stream_artifact(download).await
}

/// Stream a specific version's artifact.
pub async fn download_version(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> AppResult<Response> {
    let download = state.ota.open_artifact(&version).await?;
    stream_artifact(download).await
}

async fn stream_artifact(download: FirmwareDownload) -> AppResult<Response> {
    let FirmwareDownload { metadata, path } = download;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::Core(CoreError::ArtifactMissing {
                filename: metadata.filename.clone(),
            })
        } else {
            AppError::Storage(e)
        }
    })?;
    let stream = ReaderStream::new(file);

    tracing::debug!(version = %metadata.version, size = metadata.file_size, "Serving firmware");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, metadata.file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", metadata.filename),
        )
        .header("X-Firmware-Version", &metadata.version)
        .header("X-Firmware-Checksum", &metadata.checksum)
        .header("X-Firmware-Size", metadata.file_size.to_string())
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

// ---------------------------------------------------------------------------
// POST /api/firmware/upload
// ---------------------------------------------------------------------------

/// Publish a firmware version. Admin only.
///
/// Multipart fields: `version`, `file` (.bin), and optional
/// `release_notes`, `rollout_percent`, `min_version`.
pub async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let max_size = state.config.firmware.max_size;

    let mut version: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;
    let mut release_notes: Option<String> = None;
    let mut rollout_percent: Option<i32> = None;
    let mut min_version: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                validate_artifact_extension(field.file_name().unwrap_or(""))?;
                data = Some(read_capped(field, max_size).await?);
            }
            "version" => version = non_empty(text(field).await?),
            "release_notes" => release_notes = non_empty(text(field).await?),
            "min_version" => min_version = non_empty(text(field).await?),
            "rollout_percent" => {
                let raw = text(field).await?;
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    rollout_percent = Some(trimmed.parse().map_err(|_| {
                        AppError::BadRequest(format!("Invalid rollout_percent '{trimmed}'"))
                    })?);
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    let version =
        version.ok_or_else(|| AppError::BadRequest("Missing required 'version' field".into()))?;
    let data = data.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let firmware = state
        .ota
        .upload_firmware(PublishRequest {
            version,
            data,
            release_notes,
            rollout_percent,
            min_version,
            uploaded_by: Some(admin.username.clone()),
        })
        .await?;

    tracing::info!(
        version = %firmware.version,
        uploaded_by = %admin.username,
        "Firmware uploaded",
    );

    let message = format!("Firmware {} uploaded successfully", firmware.version);
    Ok((
        StatusCode::CREATED,
        Json(StatusResponse::with_data(message, firmware)),
    ))
}

/// Read a file field, failing as soon as it exceeds `max_size`.
async fn read_capped(mut field: Field<'_>, max_size: usize) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if buf.len() + chunk.len() > max_size {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Firmware file too large. Maximum size: {max_size} bytes"
            ))));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

async fn text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// POST /api/firmware/report
// ---------------------------------------------------------------------------

/// Status report sent by a device during or after an OTA update.
#[derive(Debug, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(length(min = 1, max = 100))]
    pub device_id: String,
    #[validate(length(min = 1, max = 50))]
    pub firmware_version: String,
    pub status: ReportStatus,
    pub error_message: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub progress_percent: Option<i32>,
    /// Overrides the connection address when the device knows its own IP.
    pub ip_address: Option<String>,
}

/// Record a device OTA status report.
///
/// Malformed payloads get 400. Everything else gets 200; `success` is
/// false when the report could not be stored.
pub async fn report(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> AppResult<Json<StatusResponse>> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let ip_address = input
        .ip_address
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| client_ip.map(|ip| ip.to_string()));

    let recorded = state
        .ota
        .report_ota_status(NewReport {
            device_id: input.device_id,
            firmware_version: input.firmware_version,
            status: input.status,
            error_message: input.error_message,
            progress_percent: input.progress_percent,
            ip_address,
        })
        .await?;

    Ok(Json(match recorded {
        Some(_) => StatusResponse::ok("OTA status reported successfully"),
        None => StatusResponse::failed("Failed to record OTA status"),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/firmware/reports
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub success: bool,
    pub count: usize,
    pub reports: Vec<FirmwareReport>,
}

/// List device reports, most recent first. Admin only.
pub async fn list_reports(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    params: Result<Query<ReportQuery>, QueryRejection>,
) -> AppResult<Json<ReportListResponse>> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filter = ReportFilter {
        device_id: params.device_id,
        firmware_version: params.firmware_version,
    };
    let reports = state.ota.get_ota_reports(filter, params.limit).await;

    Ok(Json(ReportListResponse {
        success: true,
        count: reports.len(),
        reports,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/firmware/versions
// ---------------------------------------------------------------------------

/// Catalog rows, newest first. Admin only.
pub async fn list_versions(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let versions = state.ota.list_firmware(params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: versions }))
}

// ---------------------------------------------------------------------------
// GET /api/firmware/versions/{version}
// ---------------------------------------------------------------------------

/// A single catalog row, active or not. Admin only.
pub async fn get_version(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> AppResult<impl IntoResponse> {
    let firmware = state
        .ota
        .get_firmware_by_version(&version)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Firmware",
            key: version,
        }))?;
    Ok(Json(DataResponse { data: firmware }))
}

// ---------------------------------------------------------------------------
// PATCH /api/firmware/versions/{version}
// ---------------------------------------------------------------------------

/// Toggle `is_active`, change `rollout_percent` or `release_notes`. Admin only.
pub async fn update_version(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(version): Path<String>,
    payload: Result<Json<UpdateFirmwareMetadata>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let firmware = state.ota.update_firmware(&version, input).await?;

    tracing::info!(
        version = %firmware.version,
        user = %admin.username,
        "Firmware metadata updated",
    );

    Ok(Json(DataResponse { data: firmware }))
}
