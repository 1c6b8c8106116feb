//! Repository for the `incident_reports` table.
//!
//! Incident reports are the operator's long-term memory: written after an
//! anomaly is resolved and consulted when similar episodes recur.

use aegisflow_core::types::DbId;

use crate::models::{CreateIncidentReport, IncidentReportRow};
use crate::repositories::AnomalyRepo;
use crate::DbPool;

/// Column list for `incident_reports` SELECT queries.
const COLUMNS: &str = "\
    id, created_at, anomaly_id, device_id, \
    summary, root_cause, action_taken, outcome, lessons_learned";

/// Provides query operations for incident reports.
pub struct IncidentRepo;

impl IncidentRepo {
    /// Insert a new incident report, linking it to the device's most
    /// recent anomaly row when one exists.
    pub async fn insert(pool: &DbPool, report: &CreateIncidentReport) -> Result<DbId, sqlx::Error> {
        let anomaly_id = AnomalyRepo::latest_id_for_device(pool, &report.device_id).await?;

        let result = sqlx::query(
            "INSERT INTO incident_reports \
                (anomaly_id, device_id, summary, root_cause, action_taken, outcome, lessons_learned) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(anomaly_id)
        .bind(&report.device_id)
        .bind(&report.summary)
        .bind(&report.root_cause)
        .bind(&report.action_taken)
        .bind(&report.outcome)
        .bind(&report.lessons_learned)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Recent incident reports, newest first, optionally for one device.
    pub async fn list(
        pool: &DbPool,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<IncidentReportRow>, sqlx::Error> {
        match device_id {
            Some(device_id) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM incident_reports \
                     WHERE device_id = ? \
                     ORDER BY created_at DESC \
                     LIMIT ?"
                );
                sqlx::query_as::<_, IncidentReportRow>(&query)
                    .bind(device_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM incident_reports \
                     ORDER BY created_at DESC \
                     LIMIT ?"
                );
                sqlx::query_as::<_, IncidentReportRow>(&query)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
        }
    }
}
