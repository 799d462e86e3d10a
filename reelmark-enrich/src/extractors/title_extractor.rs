//! Title/year extraction and title normalization
//!
//! Display text such as `"Movie Title (1999)"` carries the release year as a
//! parenthesized four-digit suffix. The suffix is split off so the title can
//! be searched on its own and the year passed as a separate filter.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::TitleInfo;

/// Trailing `(YYYY)` in ASCII digits, optionally followed by whitespace
static YEAR_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([0-9]{4})\)\s*$").expect("valid year suffix regex"));

/// Any character that is neither a word character nor whitespace
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid non-word regex"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Split raw display text into title and optional year
///
/// A missing suffix is not an error: the whole trimmed text becomes the
/// title and `year` is `None`.
pub fn extract(raw_text: &str) -> TitleInfo {
    let text = raw_text.trim();

    match YEAR_SUFFIX.captures(text) {
        Some(caps) => {
            let year = caps.get(1).and_then(|m| m.as_str().parse::<u16>().ok());
            let start = caps.get(0).map(|m| m.start()).unwrap_or(text.len());
            TitleInfo {
                title: text[..start].trim().to_string(),
                year,
            }
        }
        None => TitleInfo {
            title: text.to_string(),
            year: None,
        },
    }
}

/// Normalize a title for cache-key and match comparison
///
/// Lowercase, strip punctuation, collapse whitespace runs, trim.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}
