//! AegisFlow domain core.
//!
//! Pure detection logic for the industrial telemetry monitor — no I/O,
//! no database access, no async. The building blocks:
//!
//! - [`Reading`] — one timestamped multi-metric measurement from a device.
//! - [`MetricWindow`] — bounded recent-history buffer per device/metric pair.
//! - [`DeviationFinding`] / [`Severity`] — a statistically significant
//!   departure from a window's profile, and its ordinal classification.
//! - [`AnomalyRecord`] — the open, unresolved alert state for a device.

pub mod anomaly;
pub mod error;
pub mod metric_names;
pub mod reading;
pub mod types;
pub mod window;

pub use anomaly::{classify_severity, AnomalyRecord, DeviationFinding, Severity};
pub use error::CoreError;
pub use reading::Reading;
pub use window::MetricWindow;
