//! Route definitions for firmware distribution.
//!
//! Mounted at `/api/firmware` by `build_app_router()`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::firmware;
use crate::state::AppState;

/// Multipart framing allowance on top of the artifact size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Firmware routes.
///
/// ```text
/// GET    /latest              -> get_latest
/// GET    /download            -> download_latest
/// GET    /download/{version}  -> download_version
/// POST   /upload              -> upload (admin)
/// POST   /report              -> report
/// GET    /reports             -> list_reports (admin)
/// GET    /versions            -> list_versions (admin)
/// GET    /versions/{version}  -> get_version (admin)
/// PATCH  /versions/{version}  -> update_version (admin)
/// ```
pub fn router(max_artifact_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/latest", get(firmware::get_latest))
        .route("/download", get(firmware::download_latest))
        .route("/download/{version}", get(firmware::download_version))
        .route(
            "/upload",
            post(firmware::upload).layer(DefaultBodyLimit::max(
                max_artifact_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/report", post(firmware::report))
        .route("/reports", get(firmware::list_reports))
        .route("/versions", get(firmware::list_versions))
        .route(
            "/versions/{version}",
            get(firmware::get_version).patch(firmware::update_version),
        )
}
