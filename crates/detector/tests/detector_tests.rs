//! End-to-end scenarios for the detection engine and event plumbing.
//!
//! Covers the full lifecycle: warm-up, degenerate-std streams, first
//! deviation, debounce while active, external clearing, and the pipeline's
//! channel-to-bus-to-database path against an in-memory SQLite store.

use std::sync::Arc;

use tokio::sync::mpsc;

use aegisflow_core::anomaly::Severity;
use aegisflow_core::reading::Reading;
use aegisflow_detector::pipeline::{self, PipelineConfig};
use aegisflow_detector::{AnomalyPersistence, Detector, EventBus};

fn reading(device_id: &str, timestamp: &str, temperature: f64) -> Reading {
    Reading {
        timestamp: timestamp.to_string(),
        device_id: device_id.to_string(),
        temperature: Some(temperature),
        pressure: None,
        vibration: None,
        humidity: None,
        power_consumption: None,
    }
}

/// Deterministic Gaussian-ish source: a fixed-seed linear congruential
/// generator pushed through Box-Muller. Good enough for statistical
/// sanity checks without pulling randomness into the test outcome.
struct GaussianSource {
    state: u64,
    spare: Option<f64>,
    mean: f64,
    std: f64,
}

impl GaussianSource {
    fn new(seed: u64, mean: f64, std: f64) -> Self {
        Self {
            state: seed,
            spare: None,
            mean,
            std,
        }
    }

    fn next_uniform(&mut self) -> f64 {
        // Numerical Recipes LCG constants.
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.state >> 11) as f64) / ((1u64 << 53) as f64)
    }

    fn next(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return self.mean + self.std * z;
        }
        let u1 = self.next_uniform().max(f64::MIN_POSITIVE);
        let u2 = self.next_uniform();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        self.spare = Some(r * theta.sin());
        self.mean + self.std * r * theta.cos()
    }
}

// ---------------------------------------------------------------------------
// Detection scenarios
// ---------------------------------------------------------------------------

/// 25 constant readings, then a wild outlier: the zero-std guard must fire
/// instead of producing a division-by-zero alert.
#[test]
fn constant_stream_never_alerts_even_on_spike() {
    let detector = Detector::new();

    for i in 0..25 {
        let result = detector
            .process(&reading("d1", &format!("t{i}"), 75.0))
            .expect("valid reading");
        assert!(result.is_none(), "constant stream must stay clean");
    }

    // Window holds 25 identical values: std == 0, z undefined, no finding.
    let result = detector
        .process(&reading("d1", "t25", 200.0))
        .expect("valid reading");
    assert!(result.is_none(), "std-guard must suppress the spike");
    assert!(detector.list_active().is_empty());
}

/// 20 noisy-baseline readings, then 95.0: one finding with z > 3, one
/// record, and no second event for the follow-up 96.0.
#[test]
fn noisy_baseline_then_spike_alerts_once() {
    let detector = Detector::new();
    let mut source = GaussianSource::new(42, 75.0, 3.0);

    for i in 0..20 {
        let value = source.next();
        let result = detector
            .process(&reading("d1", &format!("t{i}"), value))
            .expect("valid reading");
        assert!(result.is_none(), "baseline reading {i} must not trigger");
    }

    let record = detector
        .process(&reading("d1", "t20", 95.0))
        .expect("valid reading")
        .expect("95.0 on an N(75,3) baseline must trigger");
    assert_eq!(record.findings.len(), 1);
    assert!(record.findings[0].z_score > 3.0);
    assert_eq!(record.detected_at, "t20");

    let follow_up = detector
        .process(&reading("d1", "t21", 96.0))
        .expect("valid reading");
    assert!(follow_up.is_none(), "device already active: no second event");
    assert_eq!(detector.list_active().len(), 1);
}

/// Long-run false-positive sanity: on a stationary Gaussian stream the
/// per-reading trigger rate sits near the two-sided 3-sigma tail (~0.27%).
/// The rolling window re-estimates mean/std continuously, so allow slack.
#[test]
fn gaussian_stream_false_positive_rate_is_small() {
    let detector = Detector::new();
    let mut source = GaussianSource::new(7, 75.0, 3.0);

    let total = 5000usize;
    let mut triggers = 0usize;
    for i in 0..total {
        let value = source.next();
        if detector
            .process(&reading("d1", &format!("t{i}"), value))
            .expect("valid reading")
            .is_some()
        {
            triggers += 1;
            // Re-arm so every later excursion is counted as a fresh episode.
            detector.clear("d1");
        }
    }

    let rate = triggers as f64 / total as f64;
    assert!(
        rate < 0.02,
        "false-positive rate {rate} is far above the 3-sigma tail"
    );
}

/// A frame carrying a non-finite metric string must not enter the window:
/// a recorded NaN would poison the profile's mean/std and mask every later
/// deviation until evicted.
#[test]
fn non_finite_frame_does_not_poison_the_window() {
    let detector = Detector::new();

    // Alternating 72/78 baseline: mean 75, population std 3.
    for i in 0..30 {
        let value = if i % 2 == 0 { 72.0 } else { 78.0 };
        let result = detector
            .process(&reading("d1", &format!("t{i}"), value))
            .expect("valid reading");
        assert!(result.is_none(), "baseline reading {i} must not trigger");
    }

    // The gateway occasionally emits sentinel strings for failed sensors.
    let bad_frame: Reading = serde_json::from_str(
        r#"{"timestamp":"t30","device_id":"d1","temperature":"nan"}"#,
    )
    .expect("frame still parses");
    assert_eq!(bad_frame.temperature, None);
    assert!(detector.process(&bad_frame).expect("valid").is_none());

    // A hand-built non-finite value takes the same skip path.
    let mut inf_frame = reading("d1", "t31", 75.0);
    inf_frame.temperature = Some(f64::INFINITY);
    assert!(detector.process(&inf_frame).expect("valid").is_none());

    // The profile is intact: a genuine spike still alerts.
    let record = detector
        .process(&reading("d1", "t32", 200.0))
        .expect("valid reading")
        .expect("spike of 200.0 against mean 75/std 3 must trigger");
    assert!(record.findings[0].z_score > 3.0);
}

/// Severity reflects the complete finding set of the triggering reading.
#[test]
fn multi_metric_spike_is_classified_from_full_finding_set() {
    let detector = Detector::new();

    // Alternating baselines: temperature mean 75 std 3, pressure mean 31.5
    // std 0.5, vibration mean 1.5 std 0.4.
    for i in 0..40 {
        let delta = if i % 2 == 0 { -1.0 } else { 1.0 };
        let r = Reading {
            timestamp: format!("t{i}"),
            device_id: "d1".to_string(),
            temperature: Some(75.0 + 3.0 * delta),
            pressure: Some(31.5 + 0.5 * delta),
            vibration: Some(1.5 + 0.4 * delta),
            humidity: None,
            power_consumption: None,
        };
        assert!(detector.process(&r).expect("valid").is_none());
    }

    // All three metrics far outside their profiles at once.
    let r = Reading {
        timestamp: "spike".to_string(),
        device_id: "d1".to_string(),
        temperature: Some(120.0),
        pressure: Some(45.0),
        vibration: Some(9.0),
        humidity: None,
        power_consumption: None,
    };
    let record = detector.process(&r).expect("valid").expect("triggers");
    assert_eq!(record.findings.len(), 3);
    // Three anomalous metrics alone force critical.
    assert_eq!(record.severity, Severity::Critical);
}

// ---------------------------------------------------------------------------
// Pipeline + persistence against in-memory SQLite
// ---------------------------------------------------------------------------

async fn memory_pool() -> aegisflow_db::DbPool {
    // A single connection keeps every query on the same in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    aegisflow_db::run_migrations(&pool).await.expect("migrations");
    pool
}

/// Drive the full path: channel -> pipeline -> detector -> bus ->
/// persistence -> `anomalies` table, with reading sampling along the way.
#[tokio::test]
async fn pipeline_persists_sampled_readings_and_anomalies() {
    let pool = memory_pool().await;
    let detector = Arc::new(Detector::new());
    let bus = Arc::new(EventBus::default());

    let persistence = tokio::spawn(AnomalyPersistence::run(pool.clone(), bus.subscribe()));

    let (tx, rx) = mpsc::channel(64);
    let pipeline_handle = tokio::spawn(pipeline::run(
        Arc::clone(&detector),
        Arc::clone(&bus),
        pool.clone(),
        rx,
        PipelineConfig {
            reading_store_interval: 5,
        },
    ));

    let mut source = GaussianSource::new(42, 75.0, 3.0);
    for i in 0..30 {
        tx.send(reading("d1", &format!("t{i}"), source.next()))
            .await
            .expect("channel open");
    }
    tx.send(reading("d1", "spike", 200.0)).await.expect("channel open");

    // Close the channel so the pipeline drains and exits, then drop the bus
    // so persistence observes Closed.
    drop(tx);
    pipeline_handle.await.expect("pipeline exits cleanly");
    drop(bus);
    persistence.await.expect("persistence exits cleanly");

    // 31 readings at a store interval of 5 -> 6 sampled rows.
    let rows = aegisflow_db::repositories::ReadingRepo::recent_for_device(&pool, "d1", 50)
        .await
        .expect("query readings");
    assert_eq!(rows.len(), 6);

    let anomalies = aegisflow_db::repositories::AnomalyRepo::history(&pool, Some("d1"), 10)
        .await
        .expect("query anomalies");
    assert_eq!(anomalies.len(), 1, "one episode, one stored anomaly");
    assert_eq!(anomalies[0].device_id, "d1");
    assert_eq!(anomalies[0].action_status, "pending");

    // The stored finding set round-trips as JSON.
    let description = anomalies[0].description.as_deref().expect("findings JSON");
    let findings: serde_json::Value = serde_json::from_str(description).expect("valid JSON");
    assert!(findings.as_array().is_some_and(|f| !f.is_empty()));

    // The in-memory record is still active: persistence is a side effect,
    // not a lifecycle transition.
    assert!(detector.active_anomaly("d1").is_some());
}

/// A reading without a device id is rejected by the pipeline and the loop
/// keeps serving later readings.
#[tokio::test]
async fn pipeline_survives_unattributable_readings() {
    let pool = memory_pool().await;
    let detector = Arc::new(Detector::new());
    let bus = Arc::new(EventBus::default());

    let (tx, rx) = mpsc::channel(16);
    let pipeline_handle = tokio::spawn(pipeline::run(
        Arc::clone(&detector),
        Arc::clone(&bus),
        pool.clone(),
        rx,
        PipelineConfig::default(),
    ));

    tx.send(reading("", "t0", 75.0)).await.expect("channel open");
    tx.send(reading("d1", "t1", 75.0)).await.expect("channel open");

    drop(tx);
    pipeline_handle.await.expect("pipeline exits cleanly");

    assert_eq!(detector.device_count(), 1);
    assert!(detector.latest_reading("d1").is_some());
}
