//! Settings store accessors
//!
//! Top-level storage keys of the key-value `settings` table. Values are
//! TEXT; structured values (provider lists, cache map, region list) are
//! stored as JSON.

use reelmark_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

pub const KEY_MOVIE_CACHE: &str = "movieCache";
pub const KEY_COUNTRY_CODE: &str = "countryCode";
pub const KEY_SELECTED_PROVIDERS: &str = "selectedProviders";
pub const KEY_API_KEY: &str = "apiKey";
pub const KEY_API_SECRET: &str = "apiSecret";
pub const KEY_OPACITY: &str = "opacity";
pub const KEY_FADE_ENABLED: &str = "fadeEnabled";
pub const KEY_COUNTRIES: &str = "countries";

pub async fn get_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, KEY_API_KEY).await
}

pub async fn set_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, KEY_API_KEY, key).await
}

pub async fn get_api_secret(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, KEY_API_SECRET).await
}

pub async fn set_api_secret(db: &Pool<Sqlite>, secret: String) -> Result<()> {
    set_setting(db, KEY_API_SECRET, secret).await
}

pub async fn get_country_code(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, KEY_COUNTRY_CODE).await
}

pub async fn set_country_code(db: &Pool<Sqlite>, code: String) -> Result<()> {
    set_setting(db, KEY_COUNTRY_CODE, code).await
}

/// Selected provider names (JSON array)
pub async fn get_selected_providers(db: &Pool<Sqlite>) -> Result<Option<Vec<String>>> {
    get_json_setting(db, KEY_SELECTED_PROVIDERS).await
}

pub async fn set_selected_providers(db: &Pool<Sqlite>, providers: &[String]) -> Result<()> {
    set_json_setting(db, KEY_SELECTED_PROVIDERS, &providers).await
}

pub async fn get_opacity(db: &Pool<Sqlite>) -> Result<Option<f32>> {
    get_setting::<f32>(db, KEY_OPACITY).await
}

pub async fn set_opacity(db: &Pool<Sqlite>, opacity: f32) -> Result<()> {
    set_setting(db, KEY_OPACITY, opacity).await
}

pub async fn get_fade_enabled(db: &Pool<Sqlite>) -> Result<Option<bool>> {
    get_setting::<bool>(db, KEY_FADE_ENABLED).await
}

pub async fn set_fade_enabled(db: &Pool<Sqlite>, enabled: bool) -> Result<()> {
    set_setting(db, KEY_FADE_ENABLED, enabled).await
}

/// Read a raw TEXT value
pub async fn get_raw(db: &Pool<Sqlite>, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    Ok(row.and_then(|(value,)| value))
}

/// Upsert a raw TEXT value
pub async fn set_raw(db: &Pool<Sqlite>, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Remove a key
pub async fn delete_setting(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(db)
        .await
        .map_err(Error::Database)?;

    Ok(())
}

/// Read and decode a JSON value
pub async fn get_json_setting<T: DeserializeOwned>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    match get_raw(db, key).await? {
        Some(value) => Ok(Some(serde_json::from_str(&value)?)),
        None => Ok(None),
    }
}

/// Encode and store a JSON value
pub async fn set_json_setting<T: Serialize + ?Sized>(db: &Pool<Sqlite>, key: &str, value: &T) -> Result<()> {
    let encoded = serde_json::to_string(value)?;
    set_raw(db, key, &encoded).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_raw(db, key).await? {
        Some(value) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    set_raw(db, key, &value.to_string()).await
}
