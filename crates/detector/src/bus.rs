//! In-process anomaly event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans newly opened anomalies out to any number of
//! subscribers: the persistence task, the operator notification log, and
//! whatever else the host process attaches. Designed to be shared via
//! `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use aegisflow_core::anomaly::AnomalyRecord;

/// A clean-to-active lifecycle transition, published exactly once per
/// anomaly episode for a device.
///
/// Events for one device are published in processing order (the pipeline is
/// the single publisher); no ordering is guaranteed across devices.
#[derive(Debug, Clone)]
pub struct AnomalyEvent {
    /// The newly opened record, as handed back by the detector.
    pub record: AnomalyRecord,
    /// When the event was published (UTC), as opposed to the reading's own
    /// `detected_at` wire timestamp.
    pub emitted_at: DateTime<Utc>,
}

impl AnomalyEvent {
    pub fn new(record: AnomalyRecord) -> Self {
        Self {
            record,
            emitted_at: Utc::now(),
        }
    }
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for [`AnomalyEvent`]s.
///
/// Publishing never blocks the detection path: if the buffer is full the
/// oldest un-consumed events are dropped and slow receivers observe a
/// `RecvError::Lagged`; with zero subscribers the event is silently dropped.
pub struct EventBus {
    sender: broadcast::Sender<AnomalyEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: AnomalyEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<AnomalyEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
