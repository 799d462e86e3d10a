//! Persisted cache tier

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use thiserror::Error;

use super::entry::CacheEntry;
use crate::db::settings::{self, KEY_MOVIE_CACHE};

/// Persisted-tier read or write failure
#[derive(Debug, Error)]
#[error("Cache storage error: {0}")]
pub struct StorageError(#[from] pub reelmark_common::Error);

/// Whole-map persistence for cache entries
///
/// There is no single-key upsert: writers load the full map, modify it and
/// save it back.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load_all(&self) -> Result<BTreeMap<String, CacheEntry>, StorageError>;
    async fn save_all(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), StorageError>;
}

/// Cache map stored as JSON under the `movieCache` settings key
#[derive(Clone)]
pub struct SqliteCacheStore {
    db: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn load_all(&self) -> Result<BTreeMap<String, CacheEntry>, StorageError> {
        let entries = settings::get_json_setting(&self.db, KEY_MOVIE_CACHE).await?;
        Ok(entries.unwrap_or_default())
    }

    async fn save_all(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), StorageError> {
        settings::set_json_setting(&self.db, KEY_MOVIE_CACHE, entries).await?;
        Ok(())
    }
}
