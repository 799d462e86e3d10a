//! Two-tier availability cache
//!
//! - [`entry`]: immutable cache entries, keys and freshness evaluation
//! - [`store`]: the persisted tier (`movieCache` in the settings table)
//! - [`two_tier`]: read-through memory tier in front of the persisted tier

pub mod entry;
pub mod store;
pub mod two_tier;

pub use entry::{CacheEntry, CacheKey, Freshness, CACHE_TTL};
pub use store::{CacheStore, SqliteCacheStore, StorageError};
pub use two_tier::TwoTierCache;
