//! Enrichment workflow
//!
//! - [`orchestrator`]: the Collect / Classify / Resolve / Apply pipeline
//! - [`debounce`]: coalescing of page mutations into batches
//! - [`processed_set`]: bounded record of already-enriched elements

pub mod debounce;
pub mod orchestrator;
pub mod processed_set;

pub use debounce::{DebounceState, Debouncer, MutationIngest, DEFAULT_DEBOUNCE_WINDOW};
pub use orchestrator::{is_available, BatchReport, EnrichmentOrchestrator, MAX_LOOKUP_ATTEMPTS};
pub use processed_set::{ProcessedSet, DEFAULT_PROCESSED_CAPACITY};
