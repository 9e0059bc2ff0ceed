#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use orolexa_core::artifact_store::ArtifactStore;
use orolexa_events::DisabledNotifier;
use orolexa_firmware::catalog::PgFirmwareCatalog;
use orolexa_firmware::report_log::PgReportLog;
use orolexa_firmware::OtaService;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use orolexa_api::config::{AdminCredentials, FirmwareConfig, ServerConfig};
use orolexa_api::router::build_app_router;
use orolexa_api::state::AppState;
use orolexa_events::PushConfig;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "test-password";

/// Artifact size limit used by the test app.
pub const TEST_MAX_SIZE: usize = 64 * 1024;

/// Router plus the temporary artifact directory it writes to.
///
/// The directory is deleted when this value is dropped.
pub struct TestApp {
    pub router: Router,
    pub firmware_dir: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` with admin credentials and no push gateway.
pub fn test_config(firmware_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        firmware: FirmwareConfig {
            dir: firmware_dir.path().to_path_buf(),
            max_size: TEST_MAX_SIZE,
            base_url: "http://ota.test".to_string(),
        },
        admin: Some(AdminCredentials {
            username: ADMIN_USER.to_string(),
            password: ADMIN_PASS.to_string(),
        }),
        push: PushConfig {
            gateway_url: None,
            topic: "all_users".to_string(),
        },
    }
}

/// Build the full application router over `pool` and a fresh temp dir.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let firmware_dir = tempfile::tempdir().unwrap();
    let config = test_config(&firmware_dir);
    build_test_app_with(pool, firmware_dir, config)
}

/// Build the app with a caller-adjusted config.
pub fn build_test_app_with(pool: PgPool, firmware_dir: TempDir, config: ServerConfig) -> TestApp {
    let ota = OtaService::new(
        Arc::new(PgFirmwareCatalog::new(pool.clone())),
        Arc::new(PgReportLog::new(pool.clone())),
        ArtifactStore::new(&config.firmware.dir),
        Arc::new(DisabledNotifier),
        config.firmware.settings(),
    );
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ota: Arc::new(ota),
    };
    TestApp {
        router: build_app_router(state, &config),
        firmware_dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub fn basic_auth(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

pub fn admin_auth() -> String {
    basic_auth(ADMIN_USER, ADMIN_PASS)
}

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_admin(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", admin_auth())
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn patch_json_admin(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", admin_auth())
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

// ---------------------------------------------------------------------------
// Multipart upload
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "----orolexa-test-boundary";

/// A firmware upload form.
pub struct UploadForm<'a> {
    pub version: &'a str,
    pub file_name: &'a str,
    pub data: &'a [u8],
    pub release_notes: Option<&'a str>,
    pub rollout_percent: Option<&'a str>,
    pub min_version: Option<&'a str>,
}

impl<'a> UploadForm<'a> {
    pub fn new(version: &'a str, data: &'a [u8]) -> Self {
        Self {
            version,
            file_name: "firmware.bin",
            data,
            release_notes: None,
            rollout_percent: None,
            min_version: None,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut text = |name: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };
        text("version", self.version);
        if let Some(notes) = self.release_notes {
            text("release_notes", notes);
        }
        if let Some(percent) = self.rollout_percent {
            text("rollout_percent", percent);
        }
        if let Some(min) = self.min_version {
            text("min_version", min);
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                self.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(self.data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}

pub async fn upload(app: Router, form: UploadForm<'_>, auth: Option<String>) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/firmware/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    send(app, builder.body(Body::from(form.encode())).unwrap()).await
}

pub async fn upload_admin(app: Router, form: UploadForm<'_>) -> Response {
    upload(app, form, Some(admin_auth())).await
}
