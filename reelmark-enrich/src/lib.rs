//! reelmark-enrich library interface
//!
//! Streaming-availability enrichment for movie catalog pages: title
//! elements are matched against a metadata API, results are cached in two
//! tiers, and each element is annotated with whether any of the user's
//! selected providers carries it.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod event_log;
pub mod extractors;
pub mod page;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::cache::TwoTierCache;
use crate::services::CountryService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Settings store
    pub db: SqlitePool,
    /// Region list for `getCountries`
    pub countries: Arc<CountryService>,
    /// Availability cache, reported by `/health`
    pub cache: Arc<TwoTierCache>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, countries: Arc<CountryService>, cache: Arc<TwoTierCache>) -> Self {
        Self {
            db,
            countries,
            cache,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::message_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
