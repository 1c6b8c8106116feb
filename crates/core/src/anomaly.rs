//! Deviation findings, severity classification, and the active anomaly record.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// A single metric's statistically significant departure from its window
/// profile. Ephemeral — produced during evaluation of one reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviationFinding {
    /// Canonical metric name (see [`crate::metric_names`]).
    pub metric: String,
    /// The observed raw value.
    pub value: f64,
    /// Window mean at evaluation time (before this value was recorded).
    pub mean: f64,
    /// Window population standard deviation at evaluation time.
    pub std: f64,
    /// `|value - mean| / std`.
    pub z_score: f64,
}

/// Ordinal severity of a triggering finding set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Severity {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(crate::error::CoreError::Validation(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// Classify the severity of a non-empty finding set from one reading.
///
/// Pure and deterministic. Rules are checked from most to least severe and
/// the first match wins:
///
/// - `critical`: max z-score > 5.0 OR at least 3 anomalous metrics
/// - `high`:     max z-score > 4.0 OR at least 2 anomalous metrics
/// - `medium`:   max z-score > 3.5
/// - `low`:      otherwise
pub fn classify_severity(findings: &[DeviationFinding]) -> Severity {
    let max_z = findings.iter().map(|f| f.z_score).fold(0.0_f64, f64::max);
    let num_metrics = findings.len();

    if max_z > 5.0 || num_metrics >= 3 {
        Severity::Critical
    } else if max_z > 4.0 || num_metrics >= 2 {
        Severity::High
    } else if max_z > 3.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// The open, unresolved alert state for one device.
///
/// Created on the clean-to-active transition and owned by the detection
/// engine until an external resolution removes it. Status queries only ever
/// see clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Timestamp of the triggering reading (its wire-level timestamp).
    pub detected_at: String,
    pub device_id: String,
    pub severity: Severity,
    /// The finding set that opened this record.
    pub findings: Vec<DeviationFinding>,
    /// The full reading that triggered detection.
    pub reading: Reading,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(metric: &str, z_score: f64) -> DeviationFinding {
        DeviationFinding {
            metric: metric.to_string(),
            value: 0.0,
            mean: 0.0,
            std: 1.0,
            z_score,
        }
    }

    #[test]
    fn single_mild_finding_is_low() {
        let findings = vec![finding("temperature", 3.2)];
        assert_eq!(classify_severity(&findings), Severity::Low);
    }

    #[test]
    fn z_above_3_5_is_medium() {
        let findings = vec![finding("temperature", 3.6)];
        assert_eq!(classify_severity(&findings), Severity::Medium);
    }

    #[test]
    fn z_above_4_is_high() {
        let findings = vec![finding("temperature", 4.2)];
        assert_eq!(classify_severity(&findings), Severity::High);
    }

    #[test]
    fn two_metrics_are_high_even_with_mild_z() {
        let findings = vec![finding("temperature", 3.1), finding("pressure", 3.2)];
        assert_eq!(classify_severity(&findings), Severity::High);
    }

    #[test]
    fn z_above_5_is_critical() {
        let findings = vec![finding("vibration", 5.1)];
        assert_eq!(classify_severity(&findings), Severity::Critical);
    }

    #[test]
    fn three_mild_metrics_are_critical() {
        // Metric count dominates: three findings at z = 3.1 classify as
        // critical even though no individual z exceeds 5.
        let findings = vec![
            finding("temperature", 3.1),
            finding("pressure", 3.1),
            finding("vibration", 3.1),
        ];
        assert_eq!(classify_severity(&findings), Severity::Critical);
    }

    #[test]
    fn boundary_values_fall_through() {
        // Exactly 5.0 is not critical, exactly 4.0 is not high, exactly
        // 3.5 is not medium — thresholds are strict.
        assert_eq!(classify_severity(&[finding("t", 5.0)]), Severity::High);
        assert_eq!(classify_severity(&[finding("t", 4.0)]), Severity::Medium);
        assert_eq!(classify_severity(&[finding("t", 3.5)]), Severity::Low);
    }

    #[test]
    fn classification_is_deterministic() {
        let findings = vec![finding("temperature", 4.5), finding("humidity", 3.2)];
        let first = classify_severity(&findings);
        for _ in 0..10 {
            assert_eq!(classify_severity(&findings), first);
        }
    }

    #[test]
    fn severity_ordering_and_display() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!("medium".parse::<Severity>().unwrap(), Severity::Medium);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::High).expect("serializable");
        assert_eq!(json, "\"high\"");
    }
}
