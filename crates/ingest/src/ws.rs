//! WebSocket ingestion client.
//!
//! Connects to the sensor gateway's WebSocket endpoint and forwards each
//! JSON text frame, parsed as a [`Reading`], into the pipeline channel.
//! Connection establishment uses bounded retries with a fixed delay;
//! exhausting them is fatal and surfaces to the process owner. A dropped
//! session reconnects under the same bounded policy.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use aegisflow_core::reading::Reading;

use crate::IngestError;

/// Connection settings for the gateway WebSocket.
#[derive(Debug, Clone)]
pub struct WsIngestConfig {
    /// Gateway endpoint, e.g. `ws://gateway:9001/stream`.
    pub url: String,
    /// Connect attempts before giving up.
    pub connect_retries: u32,
    /// Fixed delay between connect attempts.
    pub retry_delay: Duration,
}

impl WsIngestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_retries: 10,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Why a receive session stopped.
enum SessionEnd {
    /// The pipeline dropped its receiver; the process is shutting down.
    ChannelClosed,
    /// The socket closed or errored; reconnect.
    SocketEnded,
}

/// Run the ingestion loop until the pipeline channel closes.
///
/// Returns an error only when the gateway stays unreachable through a full
/// retry budget.
pub async fn run(config: &WsIngestConfig, tx: mpsc::Sender<Reading>) -> Result<(), IngestError> {
    loop {
        let ws_stream = connect_with_retry(config).await?;
        tracing::info!(url = %config.url, "Gateway WebSocket connected");

        match run_session(ws_stream, &tx).await {
            SessionEnd::ChannelClosed => {
                tracing::info!("Pipeline channel closed, ingest shutting down");
                return Ok(());
            }
            SessionEnd::SocketEnded => {
                tracing::warn!("Gateway session ended, reconnecting");
            }
        }
    }
}

/// Attempt to connect up to `connect_retries` times with a fixed delay.
async fn connect_with_retry(
    config: &WsIngestConfig,
) -> Result<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, IngestError> {
    let attempts = config.connect_retries.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match connect_async(&config.url).await {
            Ok((ws_stream, _response)) => return Ok(ws_stream),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    retries = attempts,
                    "Gateway not ready, retrying"
                );
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(config.retry_delay).await;
                }
            }
        }
    }

    Err(IngestError::ConnectExhausted {
        attempts,
        source: last_err.expect("at least one attempt was made"),
    })
}

/// Drive one WebSocket session: parse and forward frames until the socket
/// or the pipeline channel goes away.
async fn run_session(
    ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    tx: &mpsc::Sender<Reading>,
) -> SessionEnd {
    let (_sink, mut stream) = ws_stream.split();

    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                if forward_frame(tx, &text).await.is_err() {
                    return SessionEnd::ChannelClosed;
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Handled automatically by tungstenite.
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "Gateway closed WebSocket");
                return SessionEnd::SocketEnded;
            }
            Some(Ok(_)) => {
                // Binary / Frame — ignore.
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "WebSocket receive error");
                return SessionEnd::SocketEnded;
            }
            None => {
                tracing::info!("WebSocket stream exhausted");
                return SessionEnd::SocketEnded;
            }
        }
    }
}

/// Parse one text frame and deliver it to the pipeline.
///
/// A malformed frame is logged and dropped — one bad producer must not
/// stall the stream. The only error returned is a closed channel.
async fn forward_frame(
    tx: &mpsc::Sender<Reading>,
    text: &str,
) -> Result<(), mpsc::error::SendError<Reading>> {
    match serde_json::from_str::<Reading>(text) {
        Ok(reading) => tx.send(reading).await,
        Err(e) => {
            tracing::warn!(error = %e, raw = %text, "Malformed reading frame, skipping");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
