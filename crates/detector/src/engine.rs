//! The detection engine: profile table, evaluation loop, anomaly lifecycle.
//!
//! All mutable state lives behind one internal mutex so that a reading is
//! processed to completion before the next one touches the same maps.
//! `process` does no I/O — persistence and notification happen outside the
//! lock, driven by the caller (see [`crate::pipeline`]).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use aegisflow_core::anomaly::{classify_severity, AnomalyRecord};
use aegisflow_core::error::CoreError;
use aegisflow_core::metric_names::ALL_METRICS;
use aegisflow_core::reading::Reading;
use aegisflow_core::window::MetricWindow;

/// Composite key for the flattened profile table: (device_id, metric name).
///
/// Flattening the two-level map keeps a single locking granularity and
/// avoids nested map bookkeeping.
type ProfileKey = (String, &'static str);

/// Mutable engine state, guarded as one unit.
#[derive(Debug, Default)]
struct DetectorState {
    /// Rolling window per (device, metric). Grows with the fleet; never
    /// shrinks — acceptable for a bounded, known set of devices.
    windows: HashMap<ProfileKey, MetricWindow>,
    /// At most one open record per device.
    active: HashMap<String, AnomalyRecord>,
    /// Most recent reading per device, anomalous or not.
    latest: HashMap<String, Reading>,
}

/// Statistical anomaly detector with per-device alert lifecycle.
///
/// One cohesive object with explicit construction — no process-wide
/// singletons, so tests can run any number of independent instances.
/// Share across tasks via `Arc<Detector>`; all methods take `&self`.
#[derive(Debug, Default)]
pub struct Detector {
    state: Mutex<DetectorState>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DetectorState> {
        // Poisoning only happens if a holder panicked mid-update; the maps
        // have no invariants that a panic between inserts could break.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Process one reading to completion.
    ///
    /// Updates the latest-reading cache, evaluates and records every metric
    /// present in the reading, and — when the finding set is non-empty and
    /// the device has no open record — opens a new [`AnomalyRecord`] and
    /// returns it. The caller is responsible for fan-out (persistence,
    /// notification); this method never blocks on I/O.
    ///
    /// Returns `Ok(None)` on every normal path: insufficient history,
    /// no deviation, or a device already in the active state (debounce —
    /// at most one alert per device per episode).
    ///
    /// A reading without a device identifier is rejected with
    /// [`CoreError::Validation`]; it cannot be attributed to a profile.
    pub fn process(&self, reading: &Reading) -> Result<Option<AnomalyRecord>, CoreError> {
        reading.validate()?;
        let device_id = reading.device_id.clone();

        let mut state = self.state();

        state.latest.insert(device_id.clone(), reading.clone());

        // Evaluate all metrics before classifying: severity must see the
        // complete finding set for this reading.
        let mut findings = Vec::new();
        for metric in ALL_METRICS {
            let Some(value) = reading.metric(metric) else {
                continue; // absent metric: skipped, not zero
            };
            if !value.is_finite() {
                // A NaN or infinity in the window would corrupt its
                // mean/std for up to a full capacity's worth of readings.
                tracing::warn!(device_id = %device_id, metric, "Non-finite metric value skipped");
                continue;
            }

            let window = state
                .windows
                .entry((device_id.clone(), metric))
                .or_insert_with(MetricWindow::new);

            // The value is recorded whether or not it deviates, so the
            // profile keeps tracking the device through an episode.
            if let Some(finding) = window.observe(metric, value) {
                findings.push(finding);
            }
        }

        if findings.is_empty() {
            return Ok(None);
        }

        if state.active.contains_key(&device_id) {
            // Debounce: the device is already flagged. No new event, no
            // severity recomputation, until the record is cleared.
            tracing::debug!(device_id = %device_id, "Findings suppressed, anomaly already active");
            return Ok(None);
        }

        let record = AnomalyRecord {
            detected_at: reading.timestamp.clone(),
            device_id: device_id.clone(),
            severity: classify_severity(&findings),
            findings,
            reading: reading.clone(),
        };

        state.active.insert(device_id.clone(), record.clone());
        tracing::info!(
            device_id = %device_id,
            severity = %record.severity,
            metrics = record.findings.len(),
            "Anomaly detected"
        );

        Ok(Some(record))
    }

    /// Clear the active anomaly for a device (active -> clean).
    ///
    /// Idempotent: clearing a device with no open record is a no-op.
    /// Returns whether a record was actually removed.
    pub fn clear(&self, device_id: &str) -> bool {
        let removed = self.state().active.remove(device_id).is_some();
        if removed {
            tracing::info!(device_id = %device_id, "Active anomaly cleared");
        }
        removed
    }

    /// Snapshot of the active anomaly for one device, if any.
    pub fn active_anomaly(&self, device_id: &str) -> Option<AnomalyRecord> {
        self.state().active.get(device_id).cloned()
    }

    /// Snapshot of all active anomalies, ordered by device id for stable
    /// output.
    pub fn list_active(&self) -> Vec<AnomalyRecord> {
        let state = self.state();
        let mut records: Vec<AnomalyRecord> = state.active.values().cloned().collect();
        records.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        records
    }

    /// The most recent reading seen for a device, anomalous or not.
    pub fn latest_reading(&self, device_id: &str) -> Option<Reading> {
        self.state().latest.get(device_id).cloned()
    }

    /// Latest reading per device across the fleet, ordered by device id.
    pub fn latest_readings(&self) -> Vec<Reading> {
        let state = self.state();
        let mut readings: Vec<Reading> = state.latest.values().cloned().collect();
        readings.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        readings
    }

    /// Number of distinct devices that have delivered at least one reading.
    pub fn device_count(&self) -> usize {
        self.state().latest.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
