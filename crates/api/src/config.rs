use std::path::PathBuf;

use orolexa_core::firmware::DEFAULT_MAX_ARTIFACT_BYTES;
use orolexa_events::PushConfig;
use orolexa_firmware::FirmwareSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except
/// `DATABASE_URL` (read in `main`) and the admin credentials.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`, uploads are large).
    pub request_timeout_secs: u64,
    pub firmware: FirmwareConfig,
    /// `None` disables the admin endpoints.
    pub admin: Option<AdminCredentials>,
    pub push: PushConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `300`                      |
    ///
    /// See [`FirmwareConfig::from_env`], [`AdminCredentials::from_env`] and
    /// [`PushConfig::from_env`] for the nested sections.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            firmware: FirmwareConfig::from_env(),
            admin: AdminCredentials::from_env(),
            push: PushConfig::from_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Firmware storage
// ---------------------------------------------------------------------------

/// Artifact storage and publish limits.
#[derive(Debug, Clone)]
pub struct FirmwareConfig {
    /// Directory artifacts are written to.
    pub dir: PathBuf,
    /// Maximum accepted artifact size in bytes.
    pub max_size: usize,
    /// Public base URL the stored download URL is built from.
    pub base_url: String,
}

impl FirmwareConfig {
    /// | Env Var             | Default                 |
    /// |---------------------|-------------------------|
    /// | `FIRMWARE_DIR`      | `firmware`              |
    /// | `FIRMWARE_MAX_SIZE` | `16777216` (16 MiB)     |
    /// | `BASE_URL`          | `http://localhost:8000` |
    pub fn from_env() -> Self {
        let dir = std::env::var("FIRMWARE_DIR").unwrap_or_else(|_| "firmware".into());

        let max_size: usize = std::env::var("FIRMWARE_MAX_SIZE")
            .ok()
            .map(|v| v.parse().expect("FIRMWARE_MAX_SIZE must be a valid usize"))
            .unwrap_or(DEFAULT_MAX_ARTIFACT_BYTES);

        let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8000".into());

        Self {
            dir: PathBuf::from(dir),
            max_size,
            base_url,
        }
    }

    pub fn settings(&self) -> FirmwareSettings {
        FirmwareSettings {
            max_artifact_bytes: self.max_size,
            base_url: self.base_url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Admin credentials
// ---------------------------------------------------------------------------

/// HTTP Basic credentials guarding the admin endpoints.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AdminCredentials {
    /// | Env Var      | Default |
    /// |--------------|---------|
    /// | `ADMIN_USER` | unset   |
    /// | `ADMIN_PASS` | unset   |
    ///
    /// Returns `None` unless both are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("ADMIN_USER").ok().filter(|s| !s.is_empty())?;
        let password = std::env::var("ADMIN_PASS").ok().filter(|s| !s.is_empty())?;
        Some(Self { username, password })
    }
}
