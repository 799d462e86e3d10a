//! Enrichment event logging for the binary
//!
//! Subscribes to the [`EventBus`](reelmark_common::events::EventBus) and turns
//! events into tracing output. A slow subscriber loses events (`Lagged`) but
//! keeps running; it stops only when every sender is gone.

use reelmark_common::events::EnrichmentEvent;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Log events until the bus closes; returns how many events were logged
pub async fn log_events(mut rx: broadcast::Receiver<EnrichmentEvent>) -> usize {
    let mut logged = 0;

    loop {
        match rx.recv().await {
            Ok(event) => {
                log_event(&event);
                logged += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event logger lagged behind, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Event bus closed, event logger stopping");
                break;
            }
        }
    }

    logged
}

fn log_event(event: &EnrichmentEvent) {
    match event {
        EnrichmentEvent::ElementAnnotated {
            title,
            available,
            from_cache,
            ..
        } => debug!(title = %title, available, from_cache, "Element annotated"),
        EnrichmentEvent::RefreshFailed { cache_key, error, .. } => {
            warn!(key = %cache_key, error = %error, "Stale entry kept after failed refresh")
        }
        EnrichmentEvent::BatchCompleted {
            collected,
            failures,
            ..
        } => info!(collected, failures, "Batch completed"),
    }
}
