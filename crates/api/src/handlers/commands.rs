//! Handler for operator device commands.
//!
//! Executing a command is the corrective-action path to resolving an
//! anomaly: the pending record is marked executed and the device's active
//! alert is cleared through the detector's single clearing primitive.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use aegisflow_db::repositories::AnomalyRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Commands the downstream device controllers accept.
pub const VALID_COMMANDS: [&str; 5] = [
    "emergency_shutdown",
    "reduce_load",
    "restart",
    "set_parameter",
    "enable_maintenance_mode",
];

/// Request body for executing a device command.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub parameters: String,
    #[serde(default)]
    pub justification: String,
}

/// Response for a successfully dispatched command.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: &'static str,
    pub device_id: String,
    pub command: String,
    pub parameters: String,
    pub message: String,
    pub executed_at: String,
}

/// POST /api/v1/devices/{device_id}/commands
///
/// Execute a control command on a device. Unknown commands are rejected
/// with the list of valid ones; they never reach the controllers.
pub async fn execute_command(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(input): Json<CommandRequest>,
) -> AppResult<Json<DataResponse<CommandResponse>>> {
    if !VALID_COMMANDS.contains(&input.command.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Invalid command '{}'. Valid commands are: {}",
            input.command,
            VALID_COMMANDS.join(", ")
        )));
    }

    let action = format!(
        "{}: {} ({})",
        input.command, input.parameters, input.justification
    );
    AnomalyRepo::mark_executed(&state.pool, &device_id, &action).await?;

    state.detector.clear(&device_id);
    tracing::info!(
        device_id = %device_id,
        command = %input.command,
        "Device command executed"
    );

    Ok(Json(DataResponse {
        data: CommandResponse {
            status: "executed",
            message: format!(
                "Command '{}' executed on {device_id}. Device responding normally.",
                input.command
            ),
            device_id,
            command: input.command,
            parameters: input.parameters,
            executed_at: Utc::now().to_rfc3339(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_command_list_matches_controllers() {
        assert!(VALID_COMMANDS.contains(&"emergency_shutdown"));
        assert!(VALID_COMMANDS.contains(&"enable_maintenance_mode"));
        assert!(!VALID_COMMANDS.contains(&"self_destruct"));
    }
}
