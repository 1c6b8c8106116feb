//! Repository for the `sensor_readings` table (append-only time-series).

use aegisflow_core::reading::Reading;
use aegisflow_core::types::DbId;

use crate::models::SensorReadingRow;
use crate::DbPool;

/// Column list for `sensor_readings` SELECT queries.
const COLUMNS: &str = "\
    id, timestamp, device_id, \
    temperature, pressure, vibration, humidity, power_consumption, \
    ingested_at";

/// Provides query operations for sampled sensor readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Insert one reading into the history.
    ///
    /// Duplicate inserts on retry are acceptable — the table is an
    /// append-only sample of the stream, not an exactly-once ledger.
    pub async fn insert(pool: &DbPool, reading: &Reading) -> Result<DbId, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO sensor_readings \
                (timestamp, device_id, temperature, pressure, vibration, humidity, power_consumption) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&reading.timestamp)
        .bind(&reading.device_id)
        .bind(reading.temperature)
        .bind(reading.pressure)
        .bind(reading.vibration)
        .bind(reading.humidity)
        .bind(reading.power_consumption)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent persisted readings for a device, newest first.
    pub async fn recent_for_device(
        pool: &DbPool,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<SensorReadingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_readings \
             WHERE device_id = ? \
             ORDER BY timestamp DESC \
             LIMIT ?"
        );
        sqlx::query_as::<_, SensorReadingRow>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
