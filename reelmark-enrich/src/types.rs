//! Core types and the metadata API seam
//!
//! [`MetadataApi`] is the boundary between the enrichment pipeline and the
//! remote metadata service. [`TmdbClient`](crate::services::TmdbClient) is
//! the production implementation; tests substitute scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Title and optional release year parsed from display text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleInfo {
    pub title: String,
    pub year: Option<u16>,
}

/// Best search candidate for a title query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieMatch {
    /// Remote subject identifier
    pub id: u64,
    pub title: String,
    pub popularity: f64,
}

/// Region supported by the availability endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// ISO 3166-1 alpha-2 code
    pub iso_3166_1: String,
    pub english_name: String,
}

/// Remote lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded (HTTP 429)")]
    RateLimited,

    /// Non-2xx, non-429 response
    #[error("Remote lookup failed with HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No API credentials configured")]
    MissingCredentials,
}

impl LookupError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            LookupError::Network(_) | LookupError::RateLimited => true,
            LookupError::Remote { status, .. } => *status >= 500,
            LookupError::Parse(_) | LookupError::MissingCredentials => false,
        }
    }
}

/// Remote metadata lookups used by the enrichment pipeline
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Search by title (and year when known)
    ///
    /// `Ok(None)` means zero matches, which is a valid outcome.
    async fn lookup_by_title(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<MovieMatch>, LookupError>;

    /// Flat-rate provider names for a subject in a region
    async fn lookup_availability(
        &self,
        subject_id: u64,
        region: &str,
    ) -> Result<BTreeSet<String>, LookupError>;

    /// Regions the availability endpoint knows about
    async fn supported_regions(&self) -> Result<Vec<Region>, LookupError>;
}
