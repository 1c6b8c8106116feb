//! `aegisflow-api` — the AegisFlow monitoring server.
//!
//! Wires the whole system together: SQLite store, detection engine,
//! anomaly event bus, ingest source (live gateway WebSocket or file
//! replay), and the operator-facing HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use tokio::sync::{broadcast, mpsc};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aegisflow_api::config::{IngestSource, ServerConfig};
use aegisflow_api::{router, state::AppState};
use aegisflow_detector::pipeline::{self, PipelineConfig};
use aegisflow_detector::{AnomalyEvent, AnomalyPersistence, Detector, EventBus};

/// Capacity of the ingest-to-pipeline reading channel.
const READING_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aegisflow=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://aegisflow.db".into());

    let pool = aegisflow_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    aegisflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    aegisflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Detection engine + event bus ---
    let detector = Arc::new(Detector::new());
    let event_bus = Arc::new(EventBus::default());

    // Persist every published anomaly to the store.
    let persistence_handle = tokio::spawn(AnomalyPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));

    // Operator notification log: every opened anomaly, exactly once.
    let notification_handle = tokio::spawn(run_notification_log(event_bus.subscribe()));

    // --- Processing pipeline ---
    let (reading_tx, reading_rx) = mpsc::channel(READING_CHANNEL_CAPACITY);
    let pipeline_handle = tokio::spawn(pipeline::run(
        Arc::clone(&detector),
        Arc::clone(&event_bus),
        pool.clone(),
        reading_rx,
        PipelineConfig {
            reading_store_interval: config.reading_store_interval,
        },
    ));

    // --- Ingest source ---
    let ingest_handle = spawn_ingest(&config, reading_tx);
    tracing::info!("Detection services started (pipeline, persistence, notification log)");

    // --- App state + router ---
    let state = AppState {
        pool,
        detector: Arc::clone(&detector),
        config: Arc::new(config.clone()),
    };

    let app = router::build(state)
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500 JSON.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS.
        .layer(build_cors_layer(&config));

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

    // Stop the ingest source; the pipeline drains once its sender is gone.
    ingest_handle.abort();
    let _ = tokio::time::timeout(Duration::from_secs(5), pipeline_handle).await;

    // Drop the event bus sender to close the broadcast channel. This
    // signals persistence and the notification log to shut down.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), notification_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Start the configured reading source in a background task.
///
/// Ingest failures are fatal: if the gateway stays unreachable through the
/// retry budget or the capture file cannot be read, the process exits so
/// the supervisor can restart it.
fn spawn_ingest(
    config: &ServerConfig,
    tx: mpsc::Sender<aegisflow_core::Reading>,
) -> tokio::task::JoinHandle<()> {
    match &config.ingest {
        IngestSource::Ws(url) => {
            let ws_config = aegisflow_ingest::ws::WsIngestConfig::new(url.clone());
            tokio::spawn(async move {
                if let Err(e) = aegisflow_ingest::ws::run(&ws_config, tx).await {
                    tracing::error!(error = %e, "Ingest source failed");
                    std::process::exit(1);
                }
            })
        }
        IngestSource::Replay(path) => {
            let mut replay_config = aegisflow_ingest::replay::ReplayConfig::new(path.clone());
            replay_config.speed_multiplier = config.replay_speed;
            tokio::spawn(async move {
                if let Err(e) = aegisflow_ingest::replay::run(&replay_config, tx).await {
                    tracing::error!(error = %e, "Replay source failed");
                    std::process::exit(1);
                }
            })
        }
    }
}

/// Log every anomaly event for the operator console.
///
/// This is the notification sink: invoked exactly once per clean-to-active
/// transition, decoupled from the detection path by the broadcast channel.
async fn run_notification_log(mut receiver: broadcast::Receiver<AnomalyEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                tracing::warn!(
                    device_id = %event.record.device_id,
                    severity = %event.record.severity,
                    metrics = event.record.findings.len(),
                    detected_at = %event.record.detected_at,
                    "ANOMALY detected"
                );
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Notification log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
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

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid — misconfiguration
/// should fail fast.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
