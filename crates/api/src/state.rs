use std::sync::Arc;

use aegisflow_detector::Detector;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable — inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: aegisflow_db::DbPool,
    /// The live detection engine (latest readings, active anomalies).
    pub detector: Arc<Detector>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
