//! Wall-clock helpers for record timestamps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// True when more than `ttl` has passed between `since_ms` and `now_ms`.
///
/// Timestamps in the future (clock skew) are never expired.
pub fn is_expired(since_ms: i64, now_ms: i64, ttl: Duration) -> bool {
    let age = now_ms.saturating_sub(since_ms);
    age > 0 && age as u128 > ttl.as_millis()
}
