use std::net::SocketAddr;
use std::sync::Arc;

use orolexa_core::artifact_store::ArtifactStore;
use orolexa_events::{DisabledNotifier, FirmwareNotifier, PushGatewayNotifier};
use orolexa_firmware::catalog::PgFirmwareCatalog;
use orolexa_firmware::report_log::PgReportLog;
use orolexa_firmware::OtaService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orolexa_api::config::ServerConfig;
use orolexa_api::router::build_app_router;
use orolexa_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "orolexa_api=debug,orolexa_firmware=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    if config.admin.is_none() {
        tracing::warn!("ADMIN_USER/ADMIN_PASS not set; admin endpoints are disabled");
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = orolexa_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    orolexa_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    orolexa_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Artifact storage ---
    tokio::fs::create_dir_all(&config.firmware.dir)
        .await
        .expect("Failed to create firmware directory");
    tracing::info!(dir = %config.firmware.dir.display(), "Firmware directory ready");

    // --- Notifications ---
    let notifier: Arc<dyn FirmwareNotifier> = match &config.push.gateway_url {
        Some(url) => {
            let notifier = PushGatewayNotifier::new(url.clone(), config.push.topic.clone())
                .expect("Failed to build push gateway client");
            tracing::info!(url = %url, topic = %config.push.topic, "Push notifications enabled");
            Arc::new(notifier)
        }
        None => {
            tracing::warn!("PUSH_GATEWAY_URL not set; firmware notifications are disabled");
            Arc::new(DisabledNotifier)
        }
    };

    // --- OTA service ---
    let ota = OtaService::new(
        Arc::new(PgFirmwareCatalog::new(pool.clone())),
        Arc::new(PgReportLog::new(pool.clone())),
        ArtifactStore::new(&config.firmware.dir),
        notifier,
        config.firmware.settings(),
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ota: Arc::new(ota),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
