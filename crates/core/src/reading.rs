//! The wire-level sensor reading and its validation rules.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::metric_names::{
    METRIC_HUMIDITY, METRIC_POWER_CONSUMPTION, METRIC_PRESSURE, METRIC_TEMPERATURE,
    METRIC_VIBRATION,
};

/// One timestamped measurement set from a single device.
///
/// Immutable once received. Any metric may be absent — an absent metric is
/// skipped during detection, never treated as zero. A metric carrying an
/// unparseable value deserializes to `None` so that one bad field degrades
/// that metric only, not the whole reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    /// ISO-8601 timestamp as produced by the sensor gateway.
    pub timestamp: String,

    /// Stable device identifier, e.g. `"line-1/compressor-01"`.
    #[serde(default)]
    pub device_id: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub pressure: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub vibration: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub power_consumption: Option<f64>,
}

/// Deserialize a metric field tolerantly: numbers pass through, finite
/// numeric strings are parsed, anything else becomes `None` instead of
/// failing the whole record.
///
/// Non-finite strings (`"nan"`, `"inf"`) are rejected too: a NaN recorded
/// into a window would poison its mean/std until evicted.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    })
}

impl Reading {
    /// Look up a metric value by canonical name.
    ///
    /// Returns `None` both for absent metrics and for unknown names.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            METRIC_TEMPERATURE => self.temperature,
            METRIC_PRESSURE => self.pressure,
            METRIC_VIBRATION => self.vibration,
            METRIC_HUMIDITY => self.humidity,
            METRIC_POWER_CONSUMPTION => self.power_consumption,
            _ => None,
        }
    }

    /// Reject readings that cannot be attributed to a device.
    ///
    /// A reading without a device identifier must surface to the caller,
    /// never be absorbed into someone else's statistics.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.device_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "reading is missing a device_id and cannot be attributed".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::CoreError;

    #[test]
    fn deserializes_full_reading() {
        let json = r#"{
            "timestamp": "2026-02-11T00:00:00Z",
            "device_id": "line-1/compressor-01",
            "temperature": 75.2,
            "pressure": 31.4,
            "vibration": 1.52,
            "humidity": 40.1,
            "power_consumption": 20.7
        }"#;

        let reading: Reading = serde_json::from_str(json).expect("valid reading");
        assert_eq!(reading.device_id, "line-1/compressor-01");
        assert_eq!(reading.temperature, Some(75.2));
        assert_eq!(reading.metric("pressure"), Some(31.4));
    }

    #[test]
    fn absent_metrics_are_none_not_zero() {
        let json = r#"{"timestamp": "t", "device_id": "d1", "temperature": 75.0}"#;
        let reading: Reading = serde_json::from_str(json).expect("valid reading");

        assert_eq!(reading.temperature, Some(75.0));
        assert_eq!(reading.pressure, None);
        assert_eq!(reading.humidity, None);
    }

    #[test]
    fn unparseable_metric_degrades_to_none() {
        // A bad vibration value must not reject the whole reading.
        let json = r#"{
            "timestamp": "t",
            "device_id": "d1",
            "temperature": 75.0,
            "vibration": "sensor-fault"
        }"#;
        let reading: Reading = serde_json::from_str(json).expect("reading still parses");

        assert_eq!(reading.temperature, Some(75.0));
        assert_eq!(reading.vibration, None);
    }

    #[test]
    fn non_finite_string_metric_degrades_to_none() {
        // "nan" and "inf" parse as f64 but must never reach a window.
        for bad in ["nan", "NaN", "inf", "-inf", "infinity"] {
            let json = format!(r#"{{"timestamp": "t", "device_id": "d1", "pressure": "{bad}"}}"#);
            let reading: Reading = serde_json::from_str(&json).expect("reading still parses");
            assert_eq!(reading.pressure, None, "'{bad}' must not produce a value");
        }
    }

    #[test]
    fn numeric_string_metric_is_parsed() {
        let json = r#"{"timestamp": "t", "device_id": "d1", "pressure": "31.5"}"#;
        let reading: Reading = serde_json::from_str(json).expect("valid reading");
        assert_eq!(reading.pressure, Some(31.5));
    }

    #[test]
    fn missing_device_id_fails_validation() {
        let json = r#"{"timestamp": "t", "temperature": 75.0}"#;
        let reading: Reading = serde_json::from_str(json).expect("parses with empty device_id");

        assert_matches!(reading.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn unknown_metric_name_is_none() {
        let json = r#"{"timestamp": "t", "device_id": "d1", "temperature": 75.0}"#;
        let reading: Reading = serde_json::from_str(json).expect("valid reading");
        assert_eq!(reading.metric("rpm"), None);
    }
}
