//! Errors raised by the shared settings and configuration layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the settings store and bootstrap configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Settings table query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder, log file or TOML file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON setting (cache map, provider list, region list) is malformed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML is malformed or a required setting (credentials) is missing
    #[error("Configuration error: {0}")]
    Config(String),
}
