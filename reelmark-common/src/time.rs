//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Age of `then` relative to `now`, clamped at zero for timestamps in the future
pub fn age(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let elapsed = now.signed_duration_since(then);
    if elapsed < Duration::zero() {
        Duration::zero()
    } else {
        elapsed
    }
}
