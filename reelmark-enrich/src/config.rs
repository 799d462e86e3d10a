//! Enrichment settings resolution
//!
//! Credentials resolve with priority **Database → ENV → TOML**; the other
//! settings resolve **Database → TOML → built-in default**. The result is a
//! plain [`EnrichmentSettings`] value handed to the orchestrator.

use reelmark_common::config::TomlConfig;
use reelmark_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::db::settings;
use crate::services::ApiCredentials;

pub const API_KEY_ENV: &str = "REELMARK_API_KEY";
pub const API_SECRET_ENV: &str = "REELMARK_API_SECRET";

pub const DEFAULT_REGION_CODE: &str = "US";
pub const DEFAULT_DISPLAY_OPACITY: f32 = 0.3;

/// Everything the enrichment pipeline needs to know about the user's choices
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentSettings {
    pub api_key: Option<String>,
    /// Bearer token
    pub api_secret: Option<String>,
    /// Provider names that make a title "available"
    pub target_provider_names: BTreeSet<String>,
    pub region_code: String,
    /// Opacity for unavailable titles, 0.0-1.0
    pub display_opacity: f32,
    pub fade_enabled: bool,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            target_provider_names: BTreeSet::new(),
            region_code: DEFAULT_REGION_CODE.to_string(),
            display_opacity: DEFAULT_DISPLAY_OPACITY,
            fade_enabled: true,
        }
    }
}

impl EnrichmentSettings {
    /// Resolve settings from the settings store, environment and TOML
    pub async fn load(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<Self> {
        let api_key = resolve_credential(
            "API key",
            settings::get_api_key(db).await?,
            std::env::var(API_KEY_ENV).ok(),
            toml_config.api_key.clone(),
        );
        let api_secret = resolve_credential(
            "API read token",
            settings::get_api_secret(db).await?,
            std::env::var(API_SECRET_ENV).ok(),
            toml_config.api_secret.clone(),
        );

        let region_code = settings::get_country_code(db)
            .await?
            .filter(|code| is_valid_key(code))
            .or_else(|| toml_config.region_code.clone().filter(|code| is_valid_key(code)))
            .map(|code| code.trim().to_uppercase())
            .unwrap_or_else(|| DEFAULT_REGION_CODE.to_string());

        let target_provider_names: BTreeSet<String> = settings::get_selected_providers(db)
            .await?
            .or_else(|| toml_config.target_providers.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let display_opacity = settings::get_opacity(db)
            .await?
            .or(toml_config.display_opacity)
            .unwrap_or(DEFAULT_DISPLAY_OPACITY);

        let fade_enabled = settings::get_fade_enabled(db)
            .await?
            .or(toml_config.fade_enabled)
            .unwrap_or(true);

        if target_provider_names.is_empty() {
            warn!("No target providers selected; every title will be marked unavailable");
        }

        Ok(Self {
            api_key,
            api_secret,
            target_provider_names,
            region_code,
            display_opacity: clamp_opacity(display_opacity),
            fade_enabled,
        })
    }

    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
        }
    }

    /// Fail with setup guidance when no credential is configured
    pub fn require_credentials(&self) -> Result<()> {
        if self.credentials().is_configured() {
            return Ok(());
        }

        Err(Error::Config(format!(
            "Metadata API credentials not configured. Please configure using one of:\n\
             1. Settings store: keys '{}' or '{}'\n\
             2. Environment: {}=... or {}=...\n\
             3. TOML config: api_key = \"...\" or api_secret = \"...\"",
            settings::KEY_API_KEY,
            settings::KEY_API_SECRET,
            API_KEY_ENV,
            API_SECRET_ENV
        )))
    }
}

/// Pick the highest-priority valid credential, warning on multiple sources
fn resolve_credential(
    label: &str,
    db_value: Option<String>,
    env_value: Option<String>,
    toml_value: Option<String>,
) -> Option<String> {
    let candidates = [
        ("database", db_value),
        ("environment", env_value),
        ("TOML", toml_value),
    ];

    let valid: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, value)| value.filter(|v| is_valid_key(v)).map(|v| (source, v)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(source, _)| *source).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    valid.into_iter().next().map(|(source, value)| {
        info!("{} loaded from {}", label, source);
        value
    })
}

/// Validate a key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        DEFAULT_DISPLAY_OPACITY
    } else {
        opacity.clamp(0.0, 1.0)
    }
}
