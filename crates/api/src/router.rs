//! Route table for the API server.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{anomalies, commands, health, incidents, telemetry};
use crate::state::AppState;

/// Build the full application router (health at the root, everything else
/// under `/api/v1`).
pub fn build(state: AppState) -> Router {
    let api = Router::new()
        .route("/stream", get(telemetry::get_stream))
        .route(
            "/devices/{device_id}/readings",
            get(telemetry::get_device_readings),
        )
        .route(
            "/devices/{device_id}/status",
            get(telemetry::get_device_status),
        )
        .route(
            "/devices/{device_id}/commands",
            post(commands::execute_command),
        )
        .route(
            "/devices/{device_id}/anomalies/acknowledge",
            post(anomalies::acknowledge_anomaly),
        )
        .route("/anomalies/active", get(anomalies::get_active_anomalies))
        .route("/anomalies/history", get(anomalies::get_anomaly_history))
        .route(
            "/incidents",
            get(incidents::list_incidents).post(incidents::log_incident),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .with_state(state)
}
