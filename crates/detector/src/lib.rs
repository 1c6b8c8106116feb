//! AegisFlow anomaly detection engine and event plumbing.
//!
//! This crate turns the pure domain logic of `aegisflow-core` into a running
//! service core:
//!
//! - [`Detector`] — per-device statistical profiles, the reading evaluation
//!   loop, and the active-anomaly lifecycle (at most one open alert per
//!   device).
//! - [`EventBus`] / [`AnomalyEvent`] — in-process broadcast fan-out for
//!   newly opened anomalies, backed by `tokio::sync::broadcast`.
//! - [`pipeline`] — the ingest-to-detector loop that drives [`Detector`]
//!   from a reading channel and samples readings into the database.
//! - [`AnomalyPersistence`] — background task that durably records every
//!   published anomaly.

pub mod bus;
pub mod engine;
pub mod persistence;
pub mod pipeline;

pub use bus::{AnomalyEvent, EventBus};
pub use engine::Detector;
pub use persistence::AnomalyPersistence;
