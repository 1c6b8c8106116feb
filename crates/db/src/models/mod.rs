pub mod telemetry;

pub use telemetry::{
    AnomalyRow, CreateAnomaly, CreateIncidentReport, IncidentReportRow, SensorReadingRow,
};
