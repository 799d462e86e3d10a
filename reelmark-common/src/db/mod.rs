//! Settings store bootstrap
//!
//! The persisted tier is a flat key-value `settings` table; every
//! top-level storage key (`movieCache`, `countryCode`, ...) is one row.

pub mod init;

pub use init::{create_settings_table, init_database_pool, open_in_memory_pool};
