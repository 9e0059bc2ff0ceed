use std::sync::Arc;

use orolexa_firmware::OtaService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: orolexa_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Firmware catalog, artifact store, report log and notifier.
    pub ota: Arc<OtaService>,
}
