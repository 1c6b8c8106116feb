//! The ingest-to-detector processing loop.
//!
//! Consumes readings from the delivery channel one at a time and drives the
//! [`Detector`] to completion for each: profile update, lifecycle
//! transition, then fan-out. Persistence and notification are side effects
//! performed after the detector has released its lock — a storage failure
//! is logged and never affects the in-memory decision.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use aegisflow_core::reading::Reading;
use aegisflow_db::repositories::ReadingRepo;
use aegisflow_db::DbPool;

use crate::bus::{AnomalyEvent, EventBus};
use crate::engine::Detector;

/// Tuning knobs for the processing loop.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Persist every Nth reading per device. The raw stream is dense
    /// enough that storing a sample keeps history useful without writing
    /// every row.
    pub reading_store_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reading_store_interval: 5,
        }
    }
}

/// Run the processing loop until the reading channel closes.
///
/// Each reading is handled fully before the next is received, so per-device
/// window updates and lifecycle transitions are strictly serialized.
pub async fn run(
    detector: Arc<Detector>,
    bus: Arc<EventBus>,
    pool: DbPool,
    mut readings: mpsc::Receiver<Reading>,
    config: PipelineConfig,
) {
    let store_interval = config.reading_store_interval.max(1);
    let mut seen: HashMap<String, u64> = HashMap::new();

    while let Some(reading) = readings.recv().await {
        let record = match detector.process(&reading) {
            Ok(record) => record,
            Err(e) => {
                // Unattributable reading: reported, never absorbed.
                tracing::warn!(error = %e, timestamp = %reading.timestamp, "Rejected reading");
                continue;
            }
        };

        let count = seen.entry(reading.device_id.clone()).or_insert(0);
        *count += 1;
        if *count % store_interval == 0 {
            if let Err(e) = ReadingRepo::insert(&pool, &reading).await {
                tracing::error!(
                    error = %e,
                    device_id = %reading.device_id,
                    "Failed to store reading"
                );
            }
        }

        if let Some(record) = record {
            bus.publish(AnomalyEvent::new(record));
        }
    }

    tracing::info!("Reading channel closed, pipeline shutting down");
}
