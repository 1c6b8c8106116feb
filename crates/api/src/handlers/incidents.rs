//! Handlers for incident reports — the operator's long-term memory of
//! resolved episodes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use aegisflow_core::types::DbId;
use aegisflow_db::models::{CreateIncidentReport, IncidentReportRow};
use aegisflow_db::repositories::IncidentRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::telemetry::clamp_limit;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for listing incident reports.
#[derive(Debug, Deserialize)]
pub struct IncidentQuery {
    pub device_id: Option<String>,
    pub limit: Option<i64>,
}

/// Response for a logged incident report.
#[derive(Debug, Serialize)]
pub struct IncidentLoggedResponse {
    pub id: DbId,
    pub device_id: String,
    pub message: String,
}

/// GET /api/v1/incidents
///
/// Past incident reports, newest first.
pub async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentQuery>,
) -> AppResult<Json<DataResponse<Vec<IncidentReportRow>>>> {
    let limit = clamp_limit(query.limit, 10);
    let device_id = query.device_id.as_deref().filter(|d| *d != "all");
    let rows = IncidentRepo::list(&state.pool, device_id, limit).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// POST /api/v1/incidents
///
/// Log an incident report after resolving an anomaly. The report links to
/// the device's most recent anomaly row and is served back when similar
/// episodes occur later.
pub async fn log_incident(
    State(state): State<AppState>,
    Json(input): Json<CreateIncidentReport>,
) -> AppResult<(StatusCode, Json<DataResponse<IncidentLoggedResponse>>)> {
    if input.device_id.trim().is_empty() {
        return Err(AppError::BadRequest("device_id is required".to_string()));
    }
    if input.summary.trim().is_empty() {
        return Err(AppError::BadRequest("summary is required".to_string()));
    }

    let id = IncidentRepo::insert(&state.pool, &input).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: IncidentLoggedResponse {
                id,
                message: format!("Incident report created for {}.", input.device_id),
                device_id: input.device_id,
            },
        }),
    ))
}
