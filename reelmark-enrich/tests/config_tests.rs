//! Settings resolution tests
//!
//! Credential tests touch process environment and run serially.

use reelmark_common::config::TomlConfig;
use reelmark_common::db::open_in_memory_pool;
use reelmark_enrich::config::{
    EnrichmentSettings, API_KEY_ENV, API_SECRET_ENV, DEFAULT_DISPLAY_OPACITY, DEFAULT_REGION_CODE,
};
use reelmark_enrich::db::settings;
use serial_test::serial;
use std::env;

fn clear_env() {
    env::remove_var(API_KEY_ENV);
    env::remove_var(API_SECRET_ENV);
}

#[tokio::test]
#[serial]
async fn test_database_credential_wins() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();
    settings::set_api_secret(&db, "db-token".into()).await.unwrap();
    env::set_var(API_SECRET_ENV, "env-token");
    let toml = TomlConfig {
        api_secret: Some("toml-token".into()),
        ..Default::default()
    };

    let loaded = EnrichmentSettings::load(&db, &toml).await.unwrap();

    assert_eq!(loaded.api_secret.as_deref(), Some("db-token"));
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_environment_credential_beats_toml() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();
    env::set_var(API_KEY_ENV, "env-key");
    let toml = TomlConfig {
        api_key: Some("toml-key".into()),
        ..Default::default()
    };

    let loaded = EnrichmentSettings::load(&db, &toml).await.unwrap();

    assert_eq!(loaded.api_key.as_deref(), Some("env-key"));
    assert_eq!(loaded.api_secret, None);
    assert!(loaded.require_credentials().is_ok());
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_blank_credentials_fall_through() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();
    settings::set_api_key(&db, "   ".into()).await.unwrap();
    env::set_var(API_KEY_ENV, "");
    let toml = TomlConfig {
        api_key: Some("toml-key".into()),
        ..Default::default()
    };

    let loaded = EnrichmentSettings::load(&db, &toml).await.unwrap();

    assert_eq!(loaded.api_key.as_deref(), Some("toml-key"));
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_missing_credentials_is_config_error() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();

    let loaded = EnrichmentSettings::load(&db, &TomlConfig::default()).await.unwrap();
    let err = loaded.require_credentials().unwrap_err();

    assert!(matches!(err, reelmark_common::Error::Config(_)));
    assert!(err.to_string().contains(API_SECRET_ENV));
}

#[tokio::test]
#[serial]
async fn test_defaults_without_any_source() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();

    let loaded = EnrichmentSettings::load(&db, &TomlConfig::default()).await.unwrap();

    assert_eq!(loaded.region_code, DEFAULT_REGION_CODE);
    assert_eq!(loaded.display_opacity, DEFAULT_DISPLAY_OPACITY);
    assert!(loaded.fade_enabled);
    assert!(loaded.target_provider_names.is_empty());
}

#[tokio::test]
#[serial]
async fn test_database_preferences_beat_toml() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();
    settings::set_country_code(&db, "nl".into()).await.unwrap();
    settings::set_selected_providers(&db, &["Netflix".to_string(), " Videoland ".to_string()])
        .await
        .unwrap();
    settings::set_fade_enabled(&db, false).await.unwrap();
    let toml = TomlConfig {
        region_code: Some("DE".into()),
        target_providers: Some(vec!["Hulu".into()]),
        display_opacity: Some(0.6),
        fade_enabled: Some(true),
        ..Default::default()
    };

    let loaded = EnrichmentSettings::load(&db, &toml).await.unwrap();

    assert_eq!(loaded.region_code, "NL");
    assert_eq!(
        loaded.target_provider_names.into_iter().collect::<Vec<_>>(),
        vec!["Netflix".to_string(), "Videoland".to_string()]
    );
    // Not in the database, so TOML applies
    assert_eq!(loaded.display_opacity, 0.6);
    assert!(!loaded.fade_enabled);
}

#[tokio::test]
#[serial]
async fn test_out_of_range_opacity_clamped() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();
    settings::set_opacity(&db, 3.5).await.unwrap();

    let loaded = EnrichmentSettings::load(&db, &TomlConfig::default()).await.unwrap();

    assert_eq!(loaded.display_opacity, 1.0);
}

#[tokio::test]
#[serial]
async fn test_blank_stored_region_falls_back_to_toml() {
    clear_env();
    let db = open_in_memory_pool().await.unwrap();
    settings::set_country_code(&db, "  ".into()).await.unwrap();
    let toml = TomlConfig {
        region_code: Some("de".into()),
        ..Default::default()
    };

    let loaded = EnrichmentSettings::load(&db, &toml).await.unwrap();

    assert_eq!(loaded.region_code, "DE");
}
