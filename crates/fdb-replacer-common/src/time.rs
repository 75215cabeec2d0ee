//! ---
//! fdbr_section: "01-core-functionality"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Shared primitives and utilities for the replacement runtime."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

/// Start of the window a failure must predate to count as long-lived.
///
/// Returns `None` when the threshold cannot be represented relative to `now`,
/// in which case no failure can qualify.
pub fn window_start(now: DateTime<Utc>, threshold: Duration) -> Option<DateTime<Utc>> {
    let threshold = chrono::Duration::from_std(threshold).ok()?;
    now.checked_sub_signed(threshold)
}

/// Elapsed time since `since`, clamped at zero for timestamps in the future.
pub fn elapsed_since(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

/// Render a timestamp the way decision logs report failure times.
pub fn format_failure_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_start_subtracts_threshold() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let start = window_start(now, Duration::from_secs(60)).unwrap();
        assert_eq!(start.timestamp(), 9_940);
    }

    #[test]
    fn window_start_overflow_yields_none() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        assert!(window_start(now, Duration::from_secs(u64::MAX)).is_none());
    }

    #[test]
    fn elapsed_clamps_future_timestamps() {
        let now = Utc.timestamp_opt(100, 0).unwrap();
        let later = Utc.timestamp_opt(200, 0).unwrap();
        assert_eq!(elapsed_since(now, later), Duration::ZERO);
        assert_eq!(elapsed_since(later, now), Duration::from_secs(100));
    }

    #[test]
    fn failure_time_is_rfc3339_utc() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(format_failure_time(ts), "1970-01-01T00:00:00Z");
    }
}
