//! Debounced ingestion of page mutations
//!
//! Added-node batches are coalesced before they reach the pipeline:
//!
//! ```text
//! Idle --Added--> Pending{deadline} --Added--> Pending{deadline'}
//!                      |
//!                 deadline passed
//!                      v
//!                    Flush --> Idle
//! ```
//!
//! Each event pushes the deadline out by a full window. Navigation drops
//! any pending batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::orchestrator::{BatchReport, EnrichmentOrchestrator};
use crate::page::{PageElement, PageEvent};

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending { deadline: Instant },
}

/// Debounce timer state machine, driven by explicit timestamps
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    state: DebounceState,
    batch: Vec<PageElement>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
            batch: Vec::new(),
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Pending { deadline } => Some(deadline),
        }
    }

    /// Queue added elements and (re)arm the timer
    pub fn push(&mut self, elements: Vec<PageElement>, now: Instant) {
        if elements.is_empty() {
            return;
        }
        self.batch.extend(elements);
        self.state = DebounceState::Pending {
            deadline: now + self.window,
        };
    }

    /// Flush the batch if the deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<Vec<PageElement>> {
        match self.state {
            DebounceState::Pending { deadline } if now >= deadline => self.take(),
            _ => None,
        }
    }

    /// Flush whatever is pending regardless of the deadline
    pub fn take(&mut self) -> Option<Vec<PageElement>> {
        self.state = DebounceState::Idle;
        if self.batch.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.batch))
        }
    }

    /// Drop the pending batch
    pub fn reset(&mut self) {
        self.state = DebounceState::Idle;
        self.batch.clear();
    }
}

/// Current time on the tokio clock, the one `sleep_until` waits on
fn tokio_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Event loop feeding debounced batches to the orchestrator
///
/// Each flush runs on its own task, so a slow batch never delays ingestion
/// of the next one. Batches carry no ordering guarantee relative to each
/// other.
pub struct MutationIngest {
    debouncer: Debouncer,
    orchestrator: Arc<EnrichmentOrchestrator>,
    in_flight: JoinSet<BatchReport>,
    reports: Vec<BatchReport>,
}

impl MutationIngest {
    pub fn new(orchestrator: Arc<EnrichmentOrchestrator>, window: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            orchestrator,
            in_flight: JoinSet::new(),
            reports: Vec::new(),
        }
    }

    /// Consume events until the channel closes, then flush and wait for all batches
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) -> Vec<BatchReport> {
        loop {
            let next = match self.debouncer.deadline() {
                None => events.recv().await,
                Some(deadline) => {
                    tokio::select! {
                        event = events.recv() => event,
                        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                            if let Some(batch) = self.debouncer.poll(tokio_now()) {
                                self.flush(batch);
                            }
                            continue;
                        }
                    }
                }
            };

            match next {
                Some(PageEvent::Added(elements)) => {
                    debug!(count = elements.len(), "Page mutation: nodes added");
                    self.debouncer.push(elements, tokio_now());
                }
                Some(PageEvent::Navigated) => {
                    info!("Page navigated, dropping pending batch and processed set");
                    self.debouncer.reset();
                    self.orchestrator.on_navigation();
                }
                None => break,
            }

            self.reap_finished();
        }

        if let Some(batch) = self.debouncer.take() {
            self.flush(batch);
        }

        while let Some(joined) = self.in_flight.join_next().await {
            self.record(joined);
        }

        self.reports
    }

    fn flush(&mut self, batch: Vec<PageElement>) {
        debug!(count = batch.len(), "Flushing debounced batch");
        let orchestrator = Arc::clone(&self.orchestrator);
        self.in_flight
            .spawn(async move { orchestrator.run_batch(batch).await });
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            self.record(joined);
        }
    }

    fn record(&mut self, joined: Result<BatchReport, tokio::task::JoinError>) {
        match joined {
            Ok(report) => self.reports.push(report),
            Err(e) => warn!(error = %e, "Enrichment batch task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(n: usize) -> Vec<PageElement> {
        (0..n).map(|i| PageElement::new(format!("Title {}", i))).collect()
    }

    #[test]
    fn test_idle_to_pending() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();

        assert_eq!(debouncer.state(), DebounceState::Idle);
        debouncer.push(elements(2), t0);

        assert_eq!(
            debouncer.state(),
            DebounceState::Pending {
                deadline: t0 + Duration::from_millis(300)
            }
        );
    }

    #[test]
    fn test_empty_push_stays_idle() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.push(Vec::new(), Instant::now());
        assert_eq!(debouncer.state(), DebounceState::Idle);
    }

    #[test]
    fn test_poll_before_deadline_holds_batch() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();
        debouncer.push(elements(1), t0);

        assert!(debouncer.poll(t0 + Duration::from_millis(299)).is_none());
        assert!(matches!(debouncer.state(), DebounceState::Pending { .. }));
    }

    #[test]
    fn test_rapid_pushes_coalesce_and_extend_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();

        debouncer.push(elements(1), t0);
        debouncer.push(elements(2), t0 + Duration::from_millis(200));

        // Original deadline passed, but the second push re-armed the timer
        assert!(debouncer.poll(t0 + Duration::from_millis(350)).is_none());

        let batch = debouncer.poll(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(debouncer.state(), DebounceState::Idle);
    }

    #[test]
    fn test_reset_drops_batch() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();
        debouncer.push(elements(4), t0);

        debouncer.reset();

        assert_eq!(debouncer.state(), DebounceState::Idle);
        assert!(debouncer.poll(t0 + Duration::from_secs(1)).is_none());
        assert!(debouncer.take().is_none());
    }
}
