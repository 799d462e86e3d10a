//! TMDB API client
//!
//! Title search, per-region watch providers and the supported-regions list,
//! all paced by an [`AdaptiveRateLimiter`] owned by the client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::rate_limiter::{AdaptiveRateLimiter, RateLimitConfig, RateState};
use crate::extractors::normalize_title;
use crate::types::{LookupError, MetadataApi, MovieMatch, Region};

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const USER_AGENT: &str = concat!("reelmark/", env!("CARGO_PKG_VERSION"));

/// API credentials
///
/// The bearer token (`api_secret`) wins over the query-parameter key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl ApiCredentials {
    pub fn is_configured(&self) -> bool {
        non_blank(&self.api_key).is_some() || non_blank(&self.api_secret).is_some()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct SearchMovieResponse {
    #[serde(default)]
    results: Vec<SearchMovieResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchMovieResult {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub popularity: f64,
}

#[derive(Debug, Deserialize)]
struct WatchProvidersResponse {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Deserialize)]
struct RegionProviders {
    #[serde(default)]
    flatrate: Vec<ProviderEntry>,
}

#[derive(Debug, Deserialize)]
struct ProviderEntry {
    provider_name: String,
}

#[derive(Debug, Deserialize)]
struct RegionsResponse {
    #[serde(default)]
    results: Vec<Region>,
}

/// TMDB API client
pub struct TmdbClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: ApiCredentials,
    rate_limiter: Arc<AdaptiveRateLimiter>,
}

impl TmdbClient {
    pub fn new(credentials: ApiCredentials) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: TMDB_BASE_URL.to_string(),
            credentials,
            rate_limiter: Arc::new(AdaptiveRateLimiter::default()),
        })
    }

    /// Point the client at another host (proxies, local stubs)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limiter = Arc::new(AdaptiveRateLimiter::new(config));
        self
    }

    /// Current adaptive rate
    pub fn rate_state(&self) -> RateState {
        self.rate_limiter.state()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LookupError> {
        let bearer = non_blank(&self.credentials.api_secret);
        let api_key = non_blank(&self.credentials.api_key);
        if bearer.is_none() && api_key.is_none() {
            return Err(LookupError::MissingCredentials);
        }

        self.rate_limiter.wait().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying TMDB API");

        let mut request = self.http_client.get(&url).query(query);
        request = match (bearer, api_key) {
            (Some(token), _) => request.bearer_auth(token),
            (None, Some(key)) => request.query(&[("api_key", key)]),
            (None, None) => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            self.rate_limiter.on_throttled();
            return Err(LookupError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        self.rate_limiter.on_success();

        response
            .json::<T>()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))
    }
}

/// Pick the most popular candidate, preferring exact (normalized) title matches
///
/// When no candidate's title or original title matches the query, every
/// candidate is eligible.
pub(crate) fn pick_best_match(query: &str, results: &[SearchMovieResult]) -> Option<MovieMatch> {
    let wanted = normalize_title(query);
    let matches_query = |r: &&SearchMovieResult| {
        [&r.title, &r.original_title]
            .into_iter()
            .flatten()
            .any(|t| normalize_title(t) == wanted)
    };

    let exact: Vec<&SearchMovieResult> = results.iter().filter(matches_query).collect();
    let pool: Vec<&SearchMovieResult> = if exact.is_empty() {
        results.iter().collect()
    } else {
        exact
    };

    pool.into_iter()
        .max_by(|a, b| a.popularity.total_cmp(&b.popularity))
        .map(|r| MovieMatch {
            id: r.id,
            title: r
                .title
                .clone()
                .or_else(|| r.original_title.clone())
                .unwrap_or_default(),
            popularity: r.popularity,
        })
}

#[async_trait]
impl MetadataApi for TmdbClient {
    async fn lookup_by_title(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<MovieMatch>, LookupError> {
        let mut query = vec![("query", title.to_string())];
        if let Some(year) = year {
            query.push(("year", year.to_string()));
        }

        let response: SearchMovieResponse = self.get_json("/search/movie", &query).await?;

        let best = pick_best_match(title, &response.results);
        match &best {
            Some(found) => tracing::info!(
                query = %title,
                year = ?year,
                id = found.id,
                candidates = response.results.len(),
                "TMDB search matched"
            ),
            None => tracing::info!(query = %title, year = ?year, "TMDB search returned no results"),
        }

        Ok(best)
    }

    async fn lookup_availability(
        &self,
        subject_id: u64,
        region: &str,
    ) -> Result<BTreeSet<String>, LookupError> {
        let path = format!("/movie/{}/watch/providers", subject_id);
        let response: WatchProvidersResponse = self.get_json(&path, &[]).await?;

        let providers: BTreeSet<String> = response
            .results
            .get(region)
            .map(|r| r.flatrate.iter().map(|p| p.provider_name.clone()).collect())
            .unwrap_or_default();

        tracing::debug!(
            id = subject_id,
            region = %region,
            providers = providers.len(),
            "TMDB watch providers retrieved"
        );

        Ok(providers)
    }

    async fn supported_regions(&self) -> Result<Vec<Region>, LookupError> {
        let response: RegionsResponse = self.get_json("/watch/providers/regions", &[]).await?;
        Ok(response.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: u64, title: &str, popularity: f64) -> SearchMovieResult {
        SearchMovieResult {
            id,
            title: Some(title.to_string()),
            original_title: None,
            popularity,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = TmdbClient::new(ApiCredentials::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = TmdbClient::new(ApiCredentials::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9000/3/");
        assert_eq!(client.base_url, "http://127.0.0.1:9000/3");
    }

    #[test]
    fn test_credentials_configured() {
        assert!(!ApiCredentials::default().is_configured());
        assert!(!ApiCredentials {
            api_key: Some("  ".into()),
            api_secret: None
        }
        .is_configured());
        assert!(ApiCredentials {
            api_key: None,
            api_secret: Some("token".into())
        }
        .is_configured());
    }

    #[test]
    fn test_pick_best_match_prefers_exact_titles() {
        let results = vec![
            result(1, "Inception: The Cobol Job", 90.0),
            result(2, "Inception", 40.0),
            result(3, "inception!", 55.0),
        ];

        let best = pick_best_match("Inception", &results).unwrap();
        assert_eq!(best.id, 3);
    }

    #[test]
    fn test_pick_best_match_falls_back_to_popularity() {
        let results = vec![result(7, "Heat Wave", 3.0), result(8, "The Heat", 12.0)];

        let best = pick_best_match("Heat", &results).unwrap();
        assert_eq!(best.id, 8);
    }

    #[test]
    fn test_pick_best_match_uses_original_title() {
        let results = vec![
            SearchMovieResult {
                id: 11,
                title: Some("Spirited Away".into()),
                original_title: Some("千と千尋の神隠し".into()),
                popularity: 10.0,
            },
            result(12, "Spirited", 50.0),
        ];

        let best = pick_best_match("千と千尋の神隠し", &results).unwrap();
        assert_eq!(best.id, 11);
        assert_eq!(best.title, "Spirited Away");
    }

    #[test]
    fn test_pick_best_match_empty() {
        assert!(pick_best_match("Anything", &[]).is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuits() {
        let client = TmdbClient::new(ApiCredentials::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let err = client.lookup_by_title("Inception", Some(2010)).await.unwrap_err();
        assert!(matches!(err, LookupError::MissingCredentials));
    }
}
