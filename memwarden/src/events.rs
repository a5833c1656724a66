//! Event bus for memory lifecycle events
//!
//! Components publish [`MemoryEvent`]s through a shared [`EventBus`]; the GUI
//! layer consumes them either as a raw broadcast receiver or as an
//! [`EventStream`].

use crate::models::{MemoryAlert, ResourceCategory, SystemMemoryInfo, ThresholdLevel};
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use tokio::sync::broadcast;
use tracing::trace;

/// Events emitted by the orchestrator and its subsystems
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryEvent {
    /// A sampling tick completed with a fresh (or stale-flagged) snapshot
    MemoryUpdate { info: SystemMemoryInfo },

    /// A severity threshold was crossed upward
    ThresholdTriggered {
        category: ResourceCategory,
        level: ThresholdLevel,
        usage_percentage: f64,
    },

    /// Usage dropped below a threshold minus its hysteresis margin
    ThresholdCleared {
        category: ResourceCategory,
        level: ThresholdLevel,
        usage_percentage: f64,
    },

    /// A new alert was created (dedup updates are not re-announced)
    AlertCreated { alert: MemoryAlert },

    /// Emergency cleanup finished, successfully or partially
    EmergencyCleanupCompleted {
        memory_saved_bytes: u64,
        actions_taken: Vec<String>,
    },
}

/// Type alias for subscriber-facing event streams
pub type EventStream = Pin<Box<dyn Stream<Item = MemoryEvent> + Send>>;

/// Broadcast-backed event bus shared by all subsystems
///
/// Publishing never blocks and never fails: when no subscriber is attached
/// the event is dropped, matching `tokio::sync::broadcast` semantics.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MemoryEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: MemoryEvent) {
        trace!(?event, "publishing memory event");
        let _ = self.sender.send(event);
    }

    /// Subscribe to subsequent events
    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`, skipping over lagged gaps
    pub fn stream(&self) -> EventStream {
        from_broadcast_receiver(self.sender.subscribe())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Create an `EventStream` from a broadcast receiver
pub fn from_broadcast_receiver(receiver: broadcast::Receiver<MemoryEvent>) -> EventStream {
    use futures::stream;

    let stream = stream::unfold(receiver, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Skip lagged events and continue with the live stream
                    trace!(skipped, "event stream lagged");
                    continue;
                }
            }
        }
    });

    Box::pin(stream)
}
