//! Reading delivery adapters.
//!
//! Two interchangeable sources feed the detection pipeline's reading
//! channel:
//!
//! - [`ws`] — a WebSocket client that subscribes to a live sensor gateway,
//!   with bounded connect retries and automatic reconnection.
//! - [`replay`] — a file replay source that streams a recorded JSON-Lines
//!   capture at an accelerated pace, for demos and local development.
//!
//! Both deliver every successfully parsed [`Reading`](aegisflow_core::Reading)
//! into an `mpsc` channel; delivery guarantees end there — the pipeline owns
//! processing.

pub mod replay;
pub mod ws;

/// Errors fatal to an ingest source.
///
/// Per-message problems (malformed frames, unparseable lines) are logged
/// and skipped, never returned; only conditions that stop the source
/// surface here.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("gateway unreachable after {attempts} attempts: {source}")]
    ConnectExhausted {
        attempts: u32,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("failed to read replay file: {0}")]
    Io(#[from] std::io::Error),
}
