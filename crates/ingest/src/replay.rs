//! File replay ingestion source.
//!
//! Streams a recorded JSON-Lines sensor capture into the pipeline at an
//! accelerated pace: between consecutive readings it sleeps for the
//! real-time gap divided by a speed multiplier, so a 24-hour capture plays
//! back in minutes. Loops at end-of-file for continuous replay.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use aegisflow_core::reading::Reading;

use crate::IngestError;

/// Replay settings.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Path to the JSON-Lines capture (one reading per line).
    pub path: PathBuf,
    /// Replay speed relative to real time. 100x plays 24 hours of data
    /// back in roughly 14 minutes.
    pub speed_multiplier: f64,
    /// Restart from the top when the file is exhausted.
    pub loop_replay: bool,
}

impl ReplayConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            speed_multiplier: 100.0,
            loop_replay: true,
        }
    }
}

/// Run the replay loop.
///
/// Returns `Ok(())` when the pipeline channel closes or (without looping)
/// at end-of-file; fails only if the capture cannot be read.
pub async fn run(config: &ReplayConfig, tx: mpsc::Sender<Reading>) -> Result<(), IngestError> {
    loop {
        tracing::info!(path = %config.path.display(), "Starting replay pass");
        if !replay_pass(config, &tx).await? {
            return Ok(()); // channel closed
        }
        if !config.loop_replay {
            tracing::info!("Replay finished (looping disabled)");
            return Ok(());
        }
    }
}

/// Stream the file once. Returns `false` when the channel closed mid-pass.
async fn replay_pass(config: &ReplayConfig, tx: &mpsc::Sender<Reading>) -> Result<bool, IngestError> {
    let file = tokio::fs::File::open(&config.path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut prev_ts: Option<DateTime<FixedOffset>> = None;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reading = match serde_json::from_str::<Reading>(line) {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed replay line");
                continue;
            }
        };

        let curr_ts = parse_timestamp(&reading.timestamp);
        if let Some(delay) = replay_delay(prev_ts, curr_ts, config.speed_multiplier) {
            tokio::time::sleep(delay).await;
        }
        if curr_ts.is_some() {
            prev_ts = curr_ts;
        }

        if tx.send(reading).await.is_err() {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Parse an ISO-8601 timestamp, tolerating a trailing `Z`.
fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok()
}

/// Sleep duration between two consecutive readings at the given speed.
///
/// `None` when either timestamp is missing/unparseable or the gap is not
/// positive (out-of-order rows replay immediately rather than stalling).
fn replay_delay(
    prev: Option<DateTime<FixedOffset>>,
    curr: Option<DateTime<FixedOffset>>,
    speed_multiplier: f64,
) -> Option<Duration> {
    let gap = curr?.signed_duration_since(prev?);
    let seconds = gap.num_milliseconds() as f64 / 1000.0;
    if seconds <= 0.0 || speed_multiplier <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds / speed_multiplier))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn delay_scales_with_speed_multiplier() {
        let prev = parse_timestamp("2026-02-11T00:00:00Z");
        let curr = parse_timestamp("2026-02-11T00:00:05Z");

        let delay = replay_delay(prev, curr, 100.0).expect("positive gap");
        assert_eq!(delay, Duration::from_millis(50));
    }

    #[test]
    fn no_delay_for_out_of_order_or_missing_timestamps() {
        let prev = parse_timestamp("2026-02-11T00:00:05Z");
        let curr = parse_timestamp("2026-02-11T00:00:00Z");

        assert!(replay_delay(prev, curr, 100.0).is_none());
        assert!(replay_delay(None, curr, 100.0).is_none());
        assert!(replay_delay(prev, None, 100.0).is_none());
    }

    #[tokio::test]
    async fn single_pass_delivers_valid_lines_and_skips_bad_ones() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"{{"timestamp":"2026-02-11T00:00:00Z","device_id":"d1","temperature":75.0}}"#
        )
        .expect("write");
        writeln!(file, "garbage line").expect("write");
        writeln!(
            file,
            r#"{{"timestamp":"2026-02-11T00:00:00.050Z","device_id":"d2","pressure":31.5}}"#
        )
        .expect("write");

        let config = ReplayConfig {
            path: file.path().to_path_buf(),
            speed_multiplier: 1000.0,
            loop_replay: false,
        };

        let (tx, mut rx) = mpsc::channel(8);
        run(&config, tx).await.expect("replay succeeds");

        let first = rx.recv().await.expect("first reading");
        assert_eq!(first.device_id, "d1");
        let second = rx.recv().await.expect("second reading");
        assert_eq!(second.device_id, "d2");
        assert!(rx.recv().await.is_none(), "channel closed after one pass");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let config = ReplayConfig::new("/nonexistent/sensor_capture.jsonl");
        let (tx, _rx) = mpsc::channel(1);

        let err = run(&config, tx).await.err().expect("must fail");
        assert!(matches!(err, IngestError::Io(_)));
    }
}
