//! Remote services
//!
//! - [`tmdb_client`]: metadata API client
//! - [`rate_limiter`]: adaptive pacing owned by the client
//! - [`country_service`]: region list for the companion messaging surface

pub mod country_service;
pub mod rate_limiter;
pub mod tmdb_client;

pub use country_service::{BackgroundRequest, BackgroundResponse, CountryService};
pub use rate_limiter::{AdaptiveRateLimiter, RateLimitConfig, RateState};
pub use tmdb_client::{ApiCredentials, TmdbClient, TMDB_BASE_URL};
