//! Text extractors
//!
//! Turn raw element text into lookup-ready [`TitleInfo`](crate::types::TitleInfo).

pub mod title_extractor;

pub use title_extractor::{extract, normalize_title};
