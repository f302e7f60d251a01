use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use armorsight_core::spec_table::SpecTable;
use armorsight_vision::yolo::{load_labels, sibling_labels_path, YoloDetector};
use armorsight_vision::DetectionPipeline;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use armorsight_api::background;
use armorsight_api::config::ServerConfig;
use armorsight_api::router::build_app_router;
use armorsight_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "armorsight_api=debug,armorsight_vision=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = armorsight_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    armorsight_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    armorsight_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Spec table ---
    let spec_table = match SpecTable::load(&config.spec_table_path) {
        Ok(table) => {
            tracing::info!(
                path = %config.spec_table_path.display(),
                rows = table.len(),
                "Spec table loaded"
            );
            table
        }
        Err(e) => {
            tracing::warn!(error = %e, "Spec table unavailable, every lookup will miss");
            SpecTable::empty()
        }
    };

    // --- Detector ---
    let labels_path = config
        .detect
        .labels_path
        .clone()
        .unwrap_or_else(|| sibling_labels_path(&config.detect.model_path));
    let labels = match load_labels(&labels_path) {
        Ok(labels) => labels,
        Err(e) => {
            tracing::warn!(
                path = %labels_path.display(),
                error = %e,
                "No label file, detections will be named by class id"
            );
            Vec::new()
        }
    };
    let detector = YoloDetector::load(&config.detect.model_path, labels, config.detect.yolo_params())
        .expect("Failed to load detection model");
    let pipeline = DetectionPipeline::new(Arc::new(detector), config.detect.pipeline_options());

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(background::session_cleanup::run(
        pool.clone(),
        cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        pipeline: Arc::new(pipeline),
        spec_table: Arc::new(spec_table),
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
