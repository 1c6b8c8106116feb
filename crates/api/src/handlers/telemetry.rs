//! Handlers for the live telemetry view: stream snapshot, device status,
//! and persisted reading history.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use aegisflow_core::anomaly::AnomalyRecord;
use aegisflow_core::error::CoreError;
use aegisflow_core::reading::Reading;
use aegisflow_db::models::SensorReadingRow;
use aegisflow_db::repositories::ReadingRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for reading-history endpoints.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum rows to return (default: 50, capped at 500).
    pub limit: Option<i64>,
}

/// Clamp a user-supplied limit to something the store can serve quickly.
pub(crate) fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, 500)
}

/// One device's current condition as seen by the detection engine.
#[derive(Debug, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    /// `"anomaly_active"` when the device has an open alert, else `"normal"`.
    pub status: &'static str,
    pub latest_reading: Reading,
    pub active_anomaly: Option<AnomalyRecord>,
}

/// GET /api/v1/stream
///
/// The most recent reading per device across the fleet, straight from the
/// in-memory cache.
pub async fn get_stream(State(state): State<AppState>) -> Json<DataResponse<Vec<Reading>>> {
    Json(DataResponse {
        data: state.detector.latest_readings(),
    })
}

/// GET /api/v1/devices/{device_id}/readings
///
/// Persisted reading history for one device, newest first. Backed by the
/// store, not the in-memory window.
pub async fn get_device_readings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<SensorReadingRow>>>> {
    let limit = clamp_limit(query.limit, 50);
    let rows = ReadingRepo::recent_for_device(&state.pool, &device_id, limit).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/devices/{device_id}/status
///
/// Current status of one device: latest reading plus any active anomaly.
/// A device the stream has never mentioned is a 404, not an empty shell.
pub async fn get_device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<DataResponse<DeviceStatus>>> {
    let latest_reading =
        state
            .detector
            .latest_reading(&device_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "device",
                id: device_id.clone(),
            })?;

    let active_anomaly = state.detector.active_anomaly(&device_id);
    let status = if active_anomaly.is_some() {
        "anomaly_active"
    } else {
        "normal"
    };

    Ok(Json(DataResponse {
        data: DeviceStatus {
            device_id,
            status,
            latest_reading,
            active_anomaly,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_clamping() {
        assert_eq!(clamp_limit(None, 50), 50);
        assert_eq!(clamp_limit(Some(10), 50), 10);
        assert_eq!(clamp_limit(Some(0), 50), 1);
        assert_eq!(clamp_limit(Some(-3), 50), 1);
        assert_eq!(clamp_limit(Some(10_000), 50), 500);
    }
}
