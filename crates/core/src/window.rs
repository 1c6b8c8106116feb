//! Rolling statistical window for one (device, metric) pair.
//!
//! Pure logic — no clocks, no I/O. The detection engine owns one
//! [`MetricWindow`] per device/metric pair and feeds it every observed
//! value in arrival order.

use std::collections::VecDeque;

use crate::anomaly::DeviationFinding;

/// Number of recent values retained per device/metric pair.
pub const WINDOW_CAPACITY: usize = 60;

/// Minimum samples before a window produces findings.
///
/// Below this floor the mean/std estimates are too unstable to trust, so
/// evaluation is skipped entirely (the value is still recorded).
pub const MIN_SAMPLES: usize = 20;

/// Z-score above which a value is considered a deviation. Strictly greater:
/// a value landing exactly on the threshold is not a finding.
pub const Z_THRESHOLD: f64 = 3.0;

/// Fixed-capacity FIFO buffer of recent metric values with incremental
/// mean / standard-deviation evaluation.
///
/// Invariants:
/// - `len() <= WINDOW_CAPACITY` at all times; the oldest value is evicted
///   first once full.
/// - A value is evaluated strictly against the window's pre-update contents,
///   never against a window that already contains it.
#[derive(Debug, Clone, Default)]
pub struct MetricWindow {
    values: VecDeque<f64>,
}

impl MetricWindow {
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Population mean of the current contents.
    fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population standard deviation (mean of squared deviations, not
    /// sample-corrected) of the current contents.
    fn std(&self, mean: f64) -> f64 {
        let mean_sq_dev = self
            .values
            .iter()
            .map(|x| (x - mean) * (x - mean))
            .sum::<f64>()
            / self.values.len() as f64;
        mean_sq_dev.sqrt()
    }

    /// Evaluate `value` against the current window contents (read-only).
    ///
    /// Yields a finding only when all three hold:
    /// - the window has accumulated at least [`MIN_SAMPLES`] values,
    /// - the window's standard deviation is non-zero (a constant window
    ///   makes the z-score undefined, so it never triggers),
    /// - the z-score `|value - mean| / std` strictly exceeds [`Z_THRESHOLD`].
    pub fn evaluate(&self, metric: &str, value: f64) -> Option<DeviationFinding> {
        if self.values.len() < MIN_SAMPLES {
            return None;
        }

        let mean = self.mean();
        let std = self.std(mean);
        if std <= 0.0 {
            return None;
        }

        let z_score = (value - mean).abs() / std;
        if z_score > Z_THRESHOLD {
            Some(DeviationFinding {
                metric: metric.to_string(),
                value,
                mean,
                std,
                z_score,
            })
        } else {
            None
        }
    }

    /// Append `value`, evicting the oldest entry if the window is full.
    pub fn record(&mut self, value: f64) {
        if self.values.len() == WINDOW_CAPACITY {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Evaluate then record, in that order.
    pub fn observe(&mut self, metric: &str, value: f64) -> Option<DeviationFinding> {
        let finding = self.evaluate(metric, value);
        self.record(value);
        finding
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
