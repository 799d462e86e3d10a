//! Region list for the companion process
//!
//! The companion (settings UI / background process) asks for the list of
//! countries it can offer in its region picker. The list is read from the
//! `countries` storage key when present; otherwise it is fetched once from
//! the metadata API and persisted.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::settings::{self, KEY_COUNTRIES};
use crate::types::{LookupError, MetadataApi, Region};

/// Requests accepted from the companion process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundRequest {
    GetCountries,
}

/// Replies sent to the companion process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundResponse {
    Countries { countries: Vec<Region> },
    Error { error: String },
}

#[derive(Debug, Error)]
pub enum CountryError {
    #[error("Region lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error("Region cache unreadable: {0}")]
    Storage(#[from] reelmark_common::Error),
}

pub struct CountryService {
    db: SqlitePool,
    api: Arc<dyn MetadataApi>,
}

impl CountryService {
    pub fn new(db: SqlitePool, api: Arc<dyn MetadataApi>) -> Self {
        Self { db, api }
    }

    /// Cached region list, fetched and persisted on first use
    ///
    /// Sorted by English name.
    pub async fn countries(&self) -> Result<Vec<Region>, CountryError> {
        if let Some(cached) = settings::get_json_setting::<Vec<Region>>(&self.db, KEY_COUNTRIES).await? {
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let mut regions = self.api.supported_regions().await?;
        regions.sort_by(|a, b| a.english_name.cmp(&b.english_name));
        info!(count = regions.len(), "Fetched supported regions");

        if let Err(e) = settings::set_json_setting(&self.db, KEY_COUNTRIES, &regions).await {
            warn!(error = %e, "Failed to persist region list");
        }

        Ok(regions)
    }

    /// Answer one companion request; failures become an error payload
    pub async fn handle(&self, request: BackgroundRequest) -> BackgroundResponse {
        match request {
            BackgroundRequest::GetCountries => match self.countries().await {
                Ok(countries) => BackgroundResponse::Countries { countries },
                Err(e) => {
                    warn!(error = %e, "getCountries failed");
                    BackgroundResponse::Error {
                        error: e.to_string(),
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request: BackgroundRequest =
            serde_json::from_str(r#"{"type":"getCountries"}"#).unwrap();
        assert_eq!(request, BackgroundRequest::GetCountries);
    }

    #[test]
    fn test_response_wire_format() {
        let response = BackgroundResponse::Countries {
            countries: vec![Region {
                iso_3166_1: "NL".into(),
                english_name: "Netherlands".into(),
            }],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "countries");
        assert_eq!(json["countries"][0]["iso_3166_1"], "NL");

        let error = BackgroundResponse::Error {
            error: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({"type": "error", "error": "boom"})
        );
    }
}
