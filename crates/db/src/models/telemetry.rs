//! Telemetry entity models and DTOs.
//!
//! Rows for the reading history, anomaly records, and incident reports.
//! Timestamps are stored as ISO-8601 TEXT, matching what the sensor
//! gateway puts on the wire.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use aegisflow_core::anomaly::AnomalyRecord;
use aegisflow_core::types::DbId;

// ---------------------------------------------------------------------------
// Sensor readings (append-only)
// ---------------------------------------------------------------------------

/// A persisted sensor reading sampled from the raw stream.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SensorReadingRow {
    pub id: DbId,
    pub timestamp: String,
    pub device_id: String,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub vibration: Option<f64>,
    pub humidity: Option<f64>,
    pub power_consumption: Option<f64>,
    pub ingested_at: String,
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

/// A persisted anomaly record, including its resolution bookkeeping.
///
/// `description` is the JSON-encoded finding set and `sensor_values` the
/// JSON-encoded triggering reading, both written verbatim at detection time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnomalyRow {
    pub id: DbId,
    pub detected_at: String,
    pub device_id: String,
    pub severity: String,
    pub description: Option<String>,
    pub sensor_values: Option<String>,
    pub proposed_action: Option<String>,
    pub action_status: String,
    pub resolved_at: Option<String>,
}

/// DTO for inserting a newly opened anomaly.
#[derive(Debug, Clone)]
pub struct CreateAnomaly {
    pub detected_at: String,
    pub device_id: String,
    pub severity: String,
    pub description: String,
    pub sensor_values: String,
}

impl CreateAnomaly {
    /// Flatten an in-memory [`AnomalyRecord`] into its storage form.
    pub fn from_record(record: &AnomalyRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            detected_at: record.detected_at.clone(),
            device_id: record.device_id.clone(),
            severity: record.severity.to_string(),
            description: serde_json::to_string(&record.findings)?,
            sensor_values: serde_json::to_string(&record.reading)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Incident reports
// ---------------------------------------------------------------------------

/// An operator's post-resolution writeup, linked to the anomaly it covers.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IncidentReportRow {
    pub id: DbId,
    pub created_at: String,
    pub anomaly_id: Option<DbId>,
    pub device_id: String,
    pub summary: Option<String>,
    pub root_cause: Option<String>,
    pub action_taken: Option<String>,
    pub outcome: Option<String>,
    pub lessons_learned: Option<String>,
}

/// DTO for logging a new incident report.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIncidentReport {
    pub device_id: String,
    pub summary: String,
    pub root_cause: String,
    pub action_taken: String,
    pub outcome: String,
    pub lessons_learned: String,
}
