use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when every dependency is reachable, `degraded` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether the artifact directory exists.
    pub storage_healthy: bool,
}

/// GET /health -- service, database and artifact directory health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = orolexa_db::health_check(&state.pool).await.is_ok();
    let storage_healthy = tokio::fs::metadata(&state.config.firmware.dir)
        .await
        .is_ok_and(|m| m.is_dir());

    let status = if db_healthy && storage_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        storage_healthy,
    })
}

/// Mount health check routes (root level, not under `/api/firmware`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
