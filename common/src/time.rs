//! Time utilities and constants for PesoPro.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Freshness and history window constants.
pub mod constants {
    use super::Duration;

    /// Maximum age of a cached current rate (4 hours).
    pub fn rate_freshness_window() -> Duration {
        Duration::hours(4)
    }

    /// Maximum age of a cached history series (24 hours).
    pub fn history_freshness_window() -> Duration {
        Duration::hours(24)
    }

    /// Number of days the history window reaches back from today.
    pub const HISTORY_DAYS: i64 = 15;
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check if something stamped at `stamped_at` is still within `window` at `now`.
///
/// Freshness is strict: an entry exactly `window` old is stale.
pub fn is_fresh(stamped_at: Timestamp, now: Timestamp, window: Duration) -> bool {
    now.signed_duration_since(stamped_at) < window
}

/// Age of a stamp at `now`, clamped at zero for stamps from the future.
pub fn age(stamped_at: Timestamp, now: Timestamp) -> Duration {
    let age = now.signed_duration_since(stamped_at);
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}

/// Inclusive calendar range `[today - days, today]`.
pub fn trailing_range(today: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

/// Format a calendar date with no time component (`2024-03-05`).
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Short label for a calendar date (`Mar 5`).
pub fn short_date_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}
