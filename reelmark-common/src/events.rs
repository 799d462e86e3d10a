//! Event types and broadcast bus for enrichment progress
//!
//! The orchestrator emits events as it annotates elements; the binary and
//! tests subscribe. Emission never blocks and never fails the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Enrichment events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnrichmentEvent {
    /// An element received an availability annotation
    ElementAnnotated {
        element: Uuid,
        title: String,
        available: bool,
        providers: Vec<String>,
        /// True when the annotation came from a cached entry
        from_cache: bool,
        timestamp: DateTime<Utc>,
    },

    /// A stale cache entry could not be refreshed; the stale result stays
    RefreshFailed {
        cache_key: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A batch finished all four pipeline steps
    BatchCompleted {
        collected: usize,
        fresh_hits: usize,
        stale_hits: usize,
        misses: usize,
        failures: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`EnrichmentEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EnrichmentEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichmentEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EnrichmentEvent,
    ) -> Result<usize, broadcast::error::SendError<EnrichmentEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EnrichmentEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
