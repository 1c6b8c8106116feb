//! Handlers for anomaly visibility and acknowledgment.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use aegisflow_core::anomaly::AnomalyRecord;
use aegisflow_db::models::AnomalyRow;
use aegisflow_db::repositories::AnomalyRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::telemetry::clamp_limit;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for the anomaly history endpoint.
#[derive(Debug, Deserialize)]
pub struct AnomalyHistoryQuery {
    /// Restrict to one device; omit for the whole fleet.
    pub device_id: Option<String>,
    pub limit: Option<i64>,
}

/// Request body for acknowledging an active anomaly.
#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub acknowledged_by: String,
    pub notes: Option<String>,
}

/// Response for a resolution action (acknowledge / command execution).
#[derive(Debug, Serialize)]
pub struct ResolutionResponse {
    pub status: &'static str,
    pub device_id: String,
    pub message: String,
}

/// GET /api/v1/anomalies/active
///
/// All currently active anomaly alerts across all devices, from the
/// in-memory lifecycle manager.
pub async fn get_active_anomalies(
    State(state): State<AppState>,
) -> Json<DataResponse<Vec<AnomalyRecord>>> {
    Json(DataResponse {
        data: state.detector.list_active(),
    })
}

/// GET /api/v1/anomalies/history
///
/// Historical anomaly records from the store, newest first.
pub async fn get_anomaly_history(
    State(state): State<AppState>,
    Query(query): Query<AnomalyHistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<AnomalyRow>>>> {
    let limit = clamp_limit(query.limit, 20);
    let device_id = query.device_id.as_deref().filter(|d| *d != "all");
    let rows = AnomalyRepo::history(&state.pool, device_id, limit).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// POST /api/v1/devices/{device_id}/anomalies/acknowledge
///
/// Acknowledge the device's active anomaly without taking corrective
/// action: mark the pending row resolved and clear the in-memory record so
/// the detector can alert again on the next episode.
pub async fn acknowledge_anomaly(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(input): Json<AcknowledgeRequest>,
) -> AppResult<Json<DataResponse<ResolutionResponse>>> {
    if input.acknowledged_by.trim().is_empty() {
        return Err(AppError::BadRequest(
            "acknowledged_by is required".to_string(),
        ));
    }

    let note = match input.notes.as_deref() {
        Some(notes) if !notes.trim().is_empty() => {
            format!("Acknowledged by {}: {}", input.acknowledged_by, notes)
        }
        _ => format!("Acknowledged by {}", input.acknowledged_by),
    };

    // Persist first, then clear. If the write fails the alert stays
    // pending and active, which is the safe direction.
    let updated = AnomalyRepo::mark_acknowledged(&state.pool, &device_id, &note).await?;
    let cleared = state.detector.clear(&device_id);

    if updated == 0 && !cleared {
        return Err(AppError::Core(aegisflow_core::error::CoreError::NotFound {
            entity: "active anomaly",
            id: device_id,
        }));
    }

    Ok(Json(DataResponse {
        data: ResolutionResponse {
            status: "acknowledged",
            message: format!("Anomaly for {device_id} acknowledged. Alert cleared."),
            device_id,
        },
    }))
}
