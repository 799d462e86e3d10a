//! Shared test fixtures
//!
//! `ScriptedApi` stands in for the remote metadata service: it answers from
//! an in-memory catalog, records every call, and can be told to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use reelmark_common::db::open_in_memory_pool;
use reelmark_common::events::EventBus;
use reelmark_enrich::cache::{CacheEntry, CacheStore, SqliteCacheStore, StorageError, TwoTierCache};
use reelmark_enrich::config::EnrichmentSettings;
use reelmark_enrich::page::SnapshotPage;
use reelmark_enrich::types::{LookupError, MetadataApi, MovieMatch, Region};
use reelmark_enrich::workflow::EnrichmentOrchestrator;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct ScriptedApi {
    movies: HashMap<String, MovieMatch>,
    providers: HashMap<u64, Vec<String>>,
    regions: Vec<Region>,
    search_errors: Mutex<VecDeque<LookupError>>,
    availability_errors: Mutex<VecDeque<LookupError>>,
    region_errors: Mutex<VecDeque<LookupError>>,
    pub search_calls: Mutex<Vec<(String, Option<u16>)>>,
    pub availability_calls: Mutex<Vec<(u64, String)>>,
    pub region_calls: Mutex<usize>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a searchable title with its flat-rate providers
    pub fn with_movie(mut self, title: &str, id: u64, providers: &[&str]) -> Self {
        self.movies.insert(
            title.to_lowercase(),
            MovieMatch {
                id,
                title: title.to_string(),
                popularity: 10.0,
            },
        );
        self.providers
            .insert(id, providers.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_regions(mut self, regions: &[(&str, &str)]) -> Self {
        self.regions = regions
            .iter()
            .map(|(code, name)| Region {
                iso_3166_1: code.to_string(),
                english_name: name.to_string(),
            })
            .collect();
        self
    }

    /// Errors returned (in order) by the next search calls
    pub fn with_search_errors(self, errors: Vec<LookupError>) -> Self {
        *self.search_errors.lock().unwrap() = errors.into();
        self
    }

    pub fn with_availability_errors(self, errors: Vec<LookupError>) -> Self {
        *self.availability_errors.lock().unwrap() = errors.into();
        self
    }

    pub fn with_region_errors(self, errors: Vec<LookupError>) -> Self {
        *self.region_errors.lock().unwrap() = errors.into();
        self
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.lock().unwrap().len()
    }

    pub fn availability_count(&self) -> usize {
        self.availability_calls.lock().unwrap().len()
    }

    pub fn searched_titles(&self) -> Vec<String> {
        self.search_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }
}

#[async_trait]
impl MetadataApi for ScriptedApi {
    async fn lookup_by_title(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<MovieMatch>, LookupError> {
        self.search_calls
            .lock()
            .unwrap()
            .push((title.to_string(), year));

        if let Some(err) = self.search_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(self.movies.get(&title.to_lowercase()).cloned())
    }

    async fn lookup_availability(
        &self,
        subject_id: u64,
        region: &str,
    ) -> Result<BTreeSet<String>, LookupError> {
        self.availability_calls
            .lock()
            .unwrap()
            .push((subject_id, region.to_string()));

        if let Some(err) = self.availability_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(self
            .providers
            .get(&subject_id)
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn supported_regions(&self) -> Result<Vec<Region>, LookupError> {
        *self.region_calls.lock().unwrap() += 1;

        if let Some(err) = self.region_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(self.regions.clone())
    }
}

/// Persisted tier that always fails
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn load_all(&self) -> Result<BTreeMap<String, CacheEntry>, StorageError> {
        Err(StorageError(reelmark_common::Error::Io(std::io::Error::other(
            "storage unavailable",
        ))))
    }

    async fn save_all(&self, _entries: &BTreeMap<String, CacheEntry>) -> Result<(), StorageError> {
        Err(StorageError(reelmark_common::Error::Io(std::io::Error::other(
            "storage unavailable",
        ))))
    }
}

/// Persisted tier kept in memory, for tests that must not touch SQLite
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load_all(&self) -> Result<BTreeMap<String, CacheEntry>, StorageError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn save_all(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), StorageError> {
        *self.entries.lock().unwrap() = entries.clone();
        Ok(())
    }
}

pub fn memory_cache() -> Arc<TwoTierCache> {
    Arc::new(TwoTierCache::new(Arc::new(MemoryStore::default())))
}

pub fn settings_with_targets(targets: &[&str]) -> EnrichmentSettings {
    EnrichmentSettings {
        api_secret: Some("test-token".to_string()),
        target_provider_names: targets.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

pub async fn sqlite_cache() -> Arc<TwoTierCache> {
    let db = open_in_memory_pool().await.unwrap();
    Arc::new(TwoTierCache::new(Arc::new(SqliteCacheStore::new(db))))
}

/// Everything a pipeline test needs
pub struct Harness {
    pub api: Arc<ScriptedApi>,
    pub cache: Arc<TwoTierCache>,
    pub page: Arc<SnapshotPage>,
    pub event_bus: EventBus,
    pub orchestrator: Arc<EnrichmentOrchestrator>,
}

impl Harness {
    pub async fn new(api: ScriptedApi, titles: &[&str], targets: &[&str]) -> Self {
        Self::with_cache(api, titles, targets, sqlite_cache().await)
    }

    pub fn with_cache(
        api: ScriptedApi,
        titles: &[&str],
        targets: &[&str],
        cache: Arc<TwoTierCache>,
    ) -> Self {
        let api = Arc::new(api);
        let page = Arc::new(SnapshotPage::from_titles(titles.iter().copied()));
        let event_bus = EventBus::new(256);
        let orchestrator = Arc::new(EnrichmentOrchestrator::new(
            api.clone(),
            cache.clone(),
            page.clone(),
            settings_with_targets(targets),
            event_bus.clone(),
        ));

        Self {
            api,
            cache,
            page,
            event_bus,
            orchestrator,
        }
    }
}
