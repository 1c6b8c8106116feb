//! Well-known sensor metric name constants.
//!
//! These are the canonical metric names used in the `sensor_readings` table,
//! the detection engine's per-device windows, and the ingest wire format.
//! The metric set is fixed; unknown metric names in a payload are ignored.

/// Machine surface temperature in degrees Celsius.
pub const METRIC_TEMPERATURE: &str = "temperature";

/// Line pressure in PSI.
pub const METRIC_PRESSURE: &str = "pressure";

/// Vibration amplitude in mm/s RMS.
pub const METRIC_VIBRATION: &str = "vibration";

/// Ambient humidity percentage (0-100).
pub const METRIC_HUMIDITY: &str = "humidity";

/// Power draw in kilowatts.
pub const METRIC_POWER_CONSUMPTION: &str = "power_consumption";

/// Every metric the detection engine evaluates, in canonical order.
pub const ALL_METRICS: [&str; 5] = [
    METRIC_TEMPERATURE,
    METRIC_PRESSURE,
    METRIC_VIBRATION,
    METRIC_HUMIDITY,
    METRIC_POWER_CONSUMPTION,
];
