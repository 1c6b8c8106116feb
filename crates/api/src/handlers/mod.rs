pub mod anomalies;
pub mod commands;
pub mod health;
pub mod incidents;
pub mod telemetry;
