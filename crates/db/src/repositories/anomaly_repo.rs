//! Repository for the `anomalies` table.
//!
//! Detection appends rows here; the command surface resolves them by
//! flipping `action_status` on the device's most recent pending row. The
//! in-memory active set is authoritative for "is this device flagged right
//! now" — these rows are the durable history.

use aegisflow_core::types::DbId;

use crate::models::{AnomalyRow, CreateAnomaly};
use crate::DbPool;

/// Column list for `anomalies` SELECT queries.
const COLUMNS: &str = "\
    id, detected_at, device_id, severity, description, sensor_values, \
    proposed_action, action_status, resolved_at";

/// Provides query operations for anomaly records.
pub struct AnomalyRepo;

impl AnomalyRepo {
    /// Insert a newly opened anomaly.
    pub async fn insert(pool: &DbPool, anomaly: &CreateAnomaly) -> Result<DbId, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO anomalies (detected_at, device_id, severity, description, sensor_values) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&anomaly.detected_at)
        .bind(&anomaly.device_id)
        .bind(&anomaly.severity)
        .bind(&anomaly.description)
        .bind(&anomaly.sensor_values)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Anomaly history, newest first, optionally filtered to one device.
    pub async fn history(
        pool: &DbPool,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AnomalyRow>, sqlx::Error> {
        match device_id {
            Some(device_id) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM anomalies \
                     WHERE device_id = ? \
                     ORDER BY detected_at DESC \
                     LIMIT ?"
                );
                sqlx::query_as::<_, AnomalyRow>(&query)
                    .bind(device_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM anomalies \
                     ORDER BY detected_at DESC \
                     LIMIT ?"
                );
                sqlx::query_as::<_, AnomalyRow>(&query)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Mark the device's most recent pending anomaly as executed, recording
    /// the command that resolved it.
    ///
    /// Returns the number of rows updated (0 when no pending row exists).
    pub async fn mark_executed(
        pool: &DbPool,
        device_id: &str,
        proposed_action: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE anomalies \
             SET proposed_action = ?, action_status = 'executed', resolved_at = datetime('now') \
             WHERE id = ( \
                 SELECT id FROM anomalies \
                 WHERE device_id = ? AND action_status = 'pending' \
                 ORDER BY detected_at DESC LIMIT 1 \
             )",
        )
        .bind(proposed_action)
        .bind(device_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark the device's most recent pending anomaly as acknowledged
    /// without corrective action.
    pub async fn mark_acknowledged(
        pool: &DbPool,
        device_id: &str,
        note: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE anomalies \
             SET proposed_action = ?, action_status = 'acknowledged', resolved_at = datetime('now') \
             WHERE id = ( \
                 SELECT id FROM anomalies \
                 WHERE device_id = ? AND action_status = 'pending' \
                 ORDER BY detected_at DESC LIMIT 1 \
             )",
        )
        .bind(note)
        .bind(device_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Id of the device's most recent anomaly, if it has any history.
    pub async fn latest_id_for_device(
        pool: &DbPool,
        device_id: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let id: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM anomalies WHERE device_id = ? ORDER BY detected_at DESC LIMIT 1",
        )
        .bind(device_id)
        .fetch_optional(pool)
        .await?;

        Ok(id.map(|(id,)| id))
    }
}
