use std::path::PathBuf;

/// Where readings come from: a live gateway socket or a recorded capture.
#[derive(Debug, Clone)]
pub enum IngestSource {
    /// Subscribe to a sensor gateway WebSocket endpoint.
    Ws(String),
    /// Replay a JSON-Lines capture file at accelerated speed.
    Replay(PathBuf),
}

/// Server configuration loaded from environment variables.
///
/// All fields except `DATABASE_URL` have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Reading source: `INGEST_WS_URL` wins when set, otherwise
    /// `REPLAY_PATH` (default `data/sensor_capture.jsonl`).
    pub ingest: IngestSource,
    /// Replay speed multiplier (default: `100`).
    pub replay_speed: f64,
    /// Persist every Nth reading per device (default: `5`).
    pub reading_store_interval: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                      |
    /// |--------------------------|------------------------------|
    /// | `HOST`                   | `0.0.0.0`                    |
    /// | `PORT`                   | `3000`                       |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`      |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                         |
    /// | `INGEST_WS_URL`          | (unset)                      |
    /// | `REPLAY_PATH`            | `data/sensor_capture.jsonl`  |
    /// | `REPLAY_SPEED`           | `100`                        |
    /// | `READING_STORE_INTERVAL` | `5`                          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let ingest = match std::env::var("INGEST_WS_URL") {
            Ok(url) if !url.trim().is_empty() => IngestSource::Ws(url),
            _ => IngestSource::Replay(PathBuf::from(
                std::env::var("REPLAY_PATH")
                    .unwrap_or_else(|_| "data/sensor_capture.jsonl".into()),
            )),
        };

        let replay_speed: f64 = std::env::var("REPLAY_SPEED")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("REPLAY_SPEED must be a valid number");

        let reading_store_interval: u64 = std::env::var("READING_STORE_INTERVAL")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("READING_STORE_INTERVAL must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            ingest,
            replay_speed,
            reading_store_interval,
        }
    }
}
