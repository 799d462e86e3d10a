//! Settings store access for reelmark-enrich
//!
//! Schema bootstrap lives in `reelmark_common::db`; this module holds the
//! typed accessors for the keys the enrichment service reads and writes.

pub mod settings;

pub use reelmark_common::db::{init_database_pool, open_in_memory_pool};
