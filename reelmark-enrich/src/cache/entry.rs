//! Cache entries and keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::extractors::normalize_title;
use crate::types::TitleInfo;

/// Entries at least this old are stale
pub const CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Lookup key derived from normalized title and year
///
/// Titles that differ only in punctuation or case share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(title: &str, year: Option<u16>) -> Self {
        let year = year.map(|y| y.to_string()).unwrap_or_default();
        Self(format!("{}_{}", normalize_title(title), year))
    }

    pub fn from_info(info: &TitleInfo) -> Self {
        Self::new(&info.title, info.year)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of comparing an entry's age against a TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Still usable, but should be refreshed in the background
    Stale,
}

/// Cached lookup result
///
/// Immutable once built: a refresh produces a new entry. An entry with no
/// subject and no tags is a negative entry (nothing found, or lookup failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    subject_id: Option<u64>,
    tags: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    recorded_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry recorded now
    pub fn record(subject_id: Option<u64>, tags: Vec<String>) -> Self {
        Self::recorded_at(subject_id, tags, reelmark_common::time::now())
    }

    /// Build an entry with an explicit record time
    ///
    /// The timestamp is truncated to milliseconds, the persisted precision,
    /// so an entry reads back identically from either tier.
    pub fn recorded_at(subject_id: Option<u64>, tags: Vec<String>, at: DateTime<Utc>) -> Self {
        let recorded_at = DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at);
        Self {
            subject_id,
            tags,
            recorded_at,
        }
    }

    /// Entry for a title with no match or a failed lookup
    pub fn negative() -> Self {
        Self::record(None, Vec::new())
    }

    pub fn subject_id(&self) -> Option<u64> {
        self.subject_id
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn recorded_at_time(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn is_negative(&self) -> bool {
        self.subject_id.is_none() && self.tags.is_empty()
    }

    /// Stale iff `now - recorded_at >= ttl`
    pub fn freshness(&self, now: DateTime<Utc>, ttl: Duration) -> Freshness {
        let age = reelmark_common::time::age(self.recorded_at, now);
        if age.num_milliseconds() as u128 >= ttl.as_millis() {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_key_from_title_and_year() {
        assert_eq!(CacheKey::new("Inception", Some(2010)).as_str(), "inception_2010");
        assert_eq!(CacheKey::new("Heat", None).as_str(), "heat_");
    }

    #[test]
    fn test_key_collides_on_punctuation_only_differences() {
        assert_eq!(
            CacheKey::new("Ocean's Eleven", Some(2001)),
            CacheKey::new("Oceans Eleven!", Some(2001))
        );
        assert_ne!(
            CacheKey::new("Oceans Eleven", Some(2001)),
            CacheKey::new("Oceans Eleven", Some(1960))
        );
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let recorded = now - ChronoDuration::hours(12);

        let exactly_ttl = CacheEntry::recorded_at(Some(1), vec![], recorded);
        assert_eq!(exactly_ttl.freshness(exactly_ttl.recorded_at_time() + ChronoDuration::hours(12), CACHE_TTL), Freshness::Stale);

        let young = CacheEntry::recorded_at(Some(1), vec![], now - ChronoDuration::hours(11));
        assert_eq!(young.freshness(now, CACHE_TTL), Freshness::Fresh);
    }

    #[test]
    fn test_recorded_at_truncated_to_millis() {
        let at = Utc::now();
        let entry = CacheEntry::recorded_at(None, vec![], at);
        assert_eq!(entry.recorded_at_time().timestamp_millis(), at.timestamp_millis());
        assert_eq!(entry.recorded_at_time().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_negative_entry() {
        let entry = CacheEntry::negative();
        assert!(entry.is_negative());
        assert!(!CacheEntry::record(Some(27205), vec![]).is_negative());
    }

    #[test]
    fn test_persisted_shape() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let entry = CacheEntry::recorded_at(Some(27205), vec!["Netflix".into()], at);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "subjectId": 27205,
                "tags": ["Netflix"],
                "recordedAt": 1_700_000_000_123i64
            })
        );

        let back: CacheEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
