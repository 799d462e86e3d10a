//! # Reelmark Common Library
//!
//! Shared code for the Reelmark enrichment service including:
//! - Error types
//! - TOML bootstrap configuration and root folder resolution
//! - Key-value settings store bootstrap (SQLite)
//! - Enrichment event bus
//! - Time helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
