//! Read-through cache: memory tier in front of the persisted tier
//!
//! Reads hit memory first without suspending; misses fall through to the
//! persisted tier and populate memory. Writes update memory synchronously,
//! then read-modify-write the whole persisted map. The persisted write is
//! not atomic: two writers interleaving between load and save lose one
//! update. The orchestrator's single-threaded execution keeps that window
//! small but does not close it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::entry::{CacheEntry, CacheKey, Freshness};
use super::store::{CacheStore, StorageError};

pub struct TwoTierCache {
    memory: Mutex<HashMap<CacheKey, CacheEntry>>,
    store: Arc<dyn CacheStore>,
}

impl TwoTierCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Look up an entry, falling through to the persisted tier on a memory miss
    pub async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        let cached = self.memory().get(key).cloned();
        if let Some(entry) = cached {
            debug!(key = %key, "Cache hit (memory)");
            return Ok(Some(entry));
        }

        let persisted = self.store.load_all().await?;
        match persisted.get(key.as_str()) {
            Some(entry) => {
                debug!(key = %key, "Cache hit (persisted)");
                self.memory().insert(key.clone(), entry.clone());
                Ok(Some(entry.clone()))
            }
            None => {
                debug!(key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Store an entry in both tiers
    ///
    /// The memory tier is updated even when the persisted write fails.
    pub async fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<(), StorageError> {
        self.memory().insert(key.clone(), entry.clone());

        let mut persisted = self.store.load_all().await?;
        persisted.insert(key.as_str().to_string(), entry);
        self.store.save_all(&persisted).await
    }

    /// Drop every entry from both tiers
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.memory().clear();
        self.store.save_all(&Default::default()).await
    }

    /// Drop stale entries from both tiers, returning how many persisted entries went
    pub async fn purge_expired(&self, now: DateTime<Utc>, ttl: Duration) -> Result<usize, StorageError> {
        self.memory()
            .retain(|_, entry| entry.freshness(now, ttl) == Freshness::Fresh);

        let mut persisted = self.store.load_all().await?;
        let before = persisted.len();
        persisted.retain(|_, entry| entry.freshness(now, ttl) == Freshness::Fresh);
        let removed = before - persisted.len();

        if removed > 0 {
            self.store.save_all(&persisted).await?;
        }

        Ok(removed)
    }

    /// Number of entries currently held in memory
    pub fn memory_len(&self) -> usize {
        self.memory().len()
    }

    fn memory(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
