//! Durable anomaly persistence service.
//!
//! [`AnomalyPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and writes every published anomaly to the `anomalies`
//! table. It runs as a long-lived background task and shuts down when the
//! bus sender is dropped. Write failures are surfaced in the log only —
//! detection correctness never depends on storage availability.

use tokio::sync::broadcast;

use aegisflow_core::types::DbId;
use aegisflow_db::models::CreateAnomaly;
use aegisflow_db::repositories::AnomalyRepo;
use aegisflow_db::DbPool;

use crate::bus::AnomalyEvent;

#[derive(Debug, thiserror::Error)]
enum PersistError {
    #[error("failed to encode anomaly: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Background service that persists anomaly events to the database.
pub struct AnomalyPersistence;

impl AnomalyPersistence {
    /// Run the persistence loop.
    ///
    /// Exits when the channel is closed (i.e. the bus is dropped).
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<AnomalyEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            device_id = %event.record.device_id,
                            "Failed to persist anomaly"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Anomaly persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, anomaly persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write a single anomaly to the `anomalies` table.
    async fn persist(pool: &DbPool, event: &AnomalyEvent) -> Result<DbId, PersistError> {
        let dto = CreateAnomaly::from_record(&event.record)?;
        Ok(AnomalyRepo::insert(pool, &dto).await?)
    }
}
