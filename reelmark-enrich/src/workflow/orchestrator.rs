//! Enrichment orchestrator
//!
//! Runs element batches through four steps:
//!
//! 1. **Collect**: skip already-processed tokens, record the rest, extract
//!    title/year, drop empty titles
//! 2. **Classify**: consult the cache for every candidate; fresh hits are
//!    applied, stale hits are applied and queued for refresh, misses are
//!    queued for lookup
//! 3. **Resolve**: misses first, then stale refreshes, one at a time through
//!    the rate-limited API
//! 4. **Apply**: write a new cache entry and annotate the element
//!
//! Classification of the whole batch completes before the first network
//! call. Failures stay with the element they belong to.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use reelmark_common::events::{EnrichmentEvent, EventBus};
use reelmark_common::time;
use tracing::{debug, info, warn};

use super::processed_set::ProcessedSet;
use crate::cache::{CacheEntry, CacheKey, Freshness, TwoTierCache, CACHE_TTL};
use crate::config::EnrichmentSettings;
use crate::extractors::extract;
use crate::page::{Annotation, ElementToken, PageElement, PageSurface};
use crate::types::{LookupError, MetadataApi, TitleInfo};

/// Attempts per remote call (first try included)
pub const MAX_LOOKUP_ATTEMPTS: u32 = 3;

/// Per-batch counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// New elements that went through Collect
    pub collected: usize,
    /// Collected elements with an empty title
    pub discarded: usize,
    pub fresh_hits: usize,
    pub stale_hits: usize,
    pub misses: usize,
    /// Miss lookups that produced an entry (including "not found")
    pub resolved: usize,
    /// Stale entries replaced by a fresh lookup
    pub refreshed: usize,
    /// Lookups that failed after retries
    pub failures: usize,
}

struct Candidate {
    token: ElementToken,
    info: TitleInfo,
    key: CacheKey,
}

/// One remote lookup shared by every element with the same key
struct PendingLookup {
    key: CacheKey,
    info: TitleInfo,
    tokens: Vec<ElementToken>,
}

fn enqueue(queue: &mut Vec<PendingLookup>, candidate: Candidate) {
    match queue.iter_mut().find(|p| p.key == candidate.key) {
        Some(pending) => pending.tokens.push(candidate.token),
        None => queue.push(PendingLookup {
            key: candidate.key,
            info: candidate.info,
            tokens: vec![candidate.token],
        }),
    }
}

/// Whether any provider tag is in the target set (case-insensitive)
pub fn is_available(tags: &[String], targets: &BTreeSet<String>) -> bool {
    let wanted: BTreeSet<String> = targets.iter().map(|t| t.to_lowercase()).collect();
    tags.iter().any(|tag| wanted.contains(&tag.to_lowercase()))
}

pub struct EnrichmentOrchestrator {
    api: Arc<dyn MetadataApi>,
    cache: Arc<TwoTierCache>,
    page: Arc<dyn PageSurface>,
    settings: RwLock<EnrichmentSettings>,
    processed: Mutex<ProcessedSet>,
    event_bus: EventBus,
    ttl: Duration,
    max_attempts: u32,
}

impl EnrichmentOrchestrator {
    pub fn new(
        api: Arc<dyn MetadataApi>,
        cache: Arc<TwoTierCache>,
        page: Arc<dyn PageSurface>,
        settings: EnrichmentSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            api,
            cache,
            page,
            settings: RwLock::new(settings),
            processed: Mutex::new(ProcessedSet::default()),
            event_bus,
            ttl: CACHE_TTL,
            max_attempts: MAX_LOOKUP_ATTEMPTS,
        }
    }

    pub fn with_processed_capacity(mut self, capacity: usize) -> Self {
        self.processed = Mutex::new(ProcessedSet::new(capacity));
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<TwoTierCache> {
        &self.cache
    }

    pub fn settings(&self) -> EnrichmentSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the settings; every element becomes eligible again
    pub fn update_settings(&self, settings: EnrichmentSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self.processed().clear();
        info!("Enrichment settings updated, processed set cleared");
    }

    /// The page navigated: forget every processed element
    pub fn on_navigation(&self) {
        self.processed().clear();
    }

    /// Allow specific elements to be enriched again
    pub fn reprocess(&self, tokens: &[ElementToken]) {
        let mut processed = self.processed();
        for token in tokens {
            processed.remove(token);
        }
    }

    pub fn processed_count(&self) -> usize {
        self.processed().len()
    }

    /// Run every element currently on the page through the pipeline
    pub async fn scan_page(&self) -> BatchReport {
        let elements = self.page.candidates();
        self.run_batch(elements).await
    }

    /// Run one batch through Collect, Classify, Resolve and Apply
    pub async fn run_batch(&self, elements: Vec<PageElement>) -> BatchReport {
        let settings = self.settings();
        let mut report = BatchReport::default();

        // Collect
        let candidates = self.collect(elements, &mut report);

        // Classify
        let now = time::now();
        let mut misses: Vec<PendingLookup> = Vec::new();
        let mut stale: Vec<PendingLookup> = Vec::new();

        for candidate in candidates {
            match self.cache.get(&candidate.key).await {
                Ok(Some(entry)) => {
                    self.apply(candidate.token, &candidate.info, &entry, &settings, true);
                    match entry.freshness(now, self.ttl) {
                        Freshness::Fresh => report.fresh_hits += 1,
                        Freshness::Stale => {
                            report.stale_hits += 1;
                            enqueue(&mut stale, candidate);
                        }
                    }
                }
                Ok(None) => {
                    report.misses += 1;
                    enqueue(&mut misses, candidate);
                }
                Err(e) => {
                    warn!(key = %candidate.key, error = %e, "Cache read failed, treating as miss");
                    report.misses += 1;
                    enqueue(&mut misses, candidate);
                }
            }
        }

        // Resolve + Apply: misses before stale refreshes
        for pending in misses {
            let entry = match self.resolve(&pending.info, &settings).await {
                Ok(entry) => {
                    report.resolved += 1;
                    entry
                }
                Err(e) => {
                    warn!(
                        key = %pending.key,
                        error = %e,
                        "Lookup failed, marking unavailable"
                    );
                    report.failures += 1;
                    CacheEntry::negative()
                }
            };
            self.store_and_apply(&pending, entry, &settings).await;
        }

        for pending in stale {
            match self.resolve(&pending.info, &settings).await {
                Ok(entry) => {
                    report.refreshed += 1;
                    self.store_and_apply(&pending, entry, &settings).await;
                }
                Err(e) => {
                    warn!(
                        key = %pending.key,
                        error = %e,
                        "Refresh failed, keeping stale entry"
                    );
                    report.failures += 1;
                    self.event_bus.emit_lossy(EnrichmentEvent::RefreshFailed {
                        cache_key: pending.key.to_string(),
                        error: e.to_string(),
                        timestamp: time::now(),
                    });
                }
            }
        }

        info!(
            collected = report.collected,
            discarded = report.discarded,
            fresh = report.fresh_hits,
            stale = report.stale_hits,
            misses = report.misses,
            failures = report.failures,
            "Enrichment batch complete"
        );
        self.event_bus.emit_lossy(EnrichmentEvent::BatchCompleted {
            collected: report.collected,
            fresh_hits: report.fresh_hits,
            stale_hits: report.stale_hits,
            misses: report.misses,
            failures: report.failures,
            timestamp: time::now(),
        });

        report
    }

    fn collect(&self, elements: Vec<PageElement>, report: &mut BatchReport) -> Vec<Candidate> {
        let mut processed = self.processed();
        let mut candidates = Vec::new();

        for element in elements {
            if !processed.insert(element.token) {
                continue;
            }
            report.collected += 1;

            let info = extract(&element.text);
            if info.title.is_empty() {
                report.discarded += 1;
                continue;
            }

            candidates.push(Candidate {
                token: element.token,
                key: CacheKey::from_info(&info),
                info,
            });
        }

        candidates
    }

    /// Search, then (when found) fetch availability
    async fn resolve(
        &self,
        info: &TitleInfo,
        settings: &EnrichmentSettings,
    ) -> Result<CacheEntry, LookupError> {
        let found = self
            .with_retries("search", || self.api.lookup_by_title(&info.title, info.year))
            .await?;

        let Some(movie) = found else {
            debug!(title = %info.title, year = ?info.year, "No match, caching empty result");
            return Ok(CacheEntry::record(None, Vec::new()));
        };

        let providers = self
            .with_retries("availability", || {
                self.api.lookup_availability(movie.id, &settings.region_code)
            })
            .await?;

        Ok(CacheEntry::record(Some(movie.id), providers.into_iter().collect()))
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, LookupError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    debug!(operation, attempt, error = %e, "Transient lookup failure, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn store_and_apply(
        &self,
        pending: &PendingLookup,
        entry: CacheEntry,
        settings: &EnrichmentSettings,
    ) {
        if let Err(e) = self.cache.put(pending.key.clone(), entry.clone()).await {
            warn!(key = %pending.key, error = %e, "Cache write failed");
        }

        for token in &pending.tokens {
            self.apply(*token, &pending.info, &entry, settings, false);
        }
    }

    fn apply(
        &self,
        token: ElementToken,
        info: &TitleInfo,
        entry: &CacheEntry,
        settings: &EnrichmentSettings,
        from_cache: bool,
    ) {
        let available = is_available(entry.tags(), &settings.target_provider_names);
        let annotation = Annotation {
            available,
            providers: entry.tags().to_vec(),
            opacity: settings.display_opacity,
            fade: settings.fade_enabled,
        };

        self.page.annotate(token, &annotation);

        self.event_bus.emit_lossy(EnrichmentEvent::ElementAnnotated {
            element: token.as_uuid(),
            title: info.title.clone(),
            available,
            providers: annotation.providers,
            from_cache,
            timestamp: time::now(),
        });
    }

    fn processed(&self) -> MutexGuard<'_, ProcessedSet> {
        self.processed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_available_intersection() {
        let tags = vec!["Netflix".to_string(), "Mubi".to_string()];
        assert!(is_available(&tags, &targets(&["Netflix"])));
        assert!(is_available(&tags, &targets(&["netflix"])));
        assert!(!is_available(&tags, &targets(&["Hulu"])));
        assert!(!is_available(&tags, &BTreeSet::new()));
        assert!(!is_available(&[], &targets(&["Netflix"])));
    }

    #[test]
    fn test_enqueue_groups_by_key() {
        let mut queue = Vec::new();
        let info = TitleInfo {
            title: "Heat".into(),
            year: Some(1995),
        };
        for _ in 0..3 {
            enqueue(
                &mut queue,
                Candidate {
                    token: ElementToken::new(),
                    key: CacheKey::from_info(&info),
                    info: info.clone(),
                },
            );
        }

        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].tokens.len(), 3);
    }
}
