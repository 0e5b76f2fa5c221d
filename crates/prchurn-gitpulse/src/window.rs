//! Recency window over blame data.
//!
//! Keeps the blame ranges whose commit is at most `window_days` calendar
//! days old and turns them into sorted intervals.

use chrono::{DateTime, Utc};
use prchurn_core::{BlameEntry, Interval, RecentChangeSet};

/// Whole calendar days between the commit's date and `now`'s date.
///
/// Times of day are ignored: a commit at 23:59 yesterday is one day old at
/// 00:01 today. Both dates are taken in UTC.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use prchurn_gitpulse::window::days_old;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 1, 0).unwrap();
/// let committed = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 0).unwrap();
/// assert_eq!(days_old(now, committed), 1);
/// ```
pub fn days_old(now: DateTime<Utc>, committed: DateTime<Utc>) -> i64 {
    (now.date_naive() - committed.date_naive()).num_days()
}

/// Intervals of the entries committed within `window_days` of `now`
/// (inclusive), sorted ascending by start.
///
/// Overlapping entries are kept as they are; callers that need disjoint
/// input should pass the result through
/// [`coalesce`](crate::overlap::coalesce).
pub fn filter_recent(entries: &[BlameEntry], now: DateTime<Utc>, window_days: u32) -> Vec<Interval> {
    let mut recent: Vec<Interval> = entries
        .iter()
        .filter(|entry| days_old(now, entry.committed_date) <= i64::from(window_days))
        .map(|entry| entry.range)
        .collect();
    recent.sort_by_key(Interval::start);
    recent
}

/// Apply [`filter_recent`] to every file, dropping files left with no
/// recent range.
pub fn recent_change_set<I>(history: I, now: DateTime<Utc>, window_days: u32) -> RecentChangeSet
where
    I: IntoIterator<Item = (String, Vec<BlameEntry>)>,
{
    history
        .into_iter()
        .filter_map(|(filename, entries)| {
            let recent = filter_recent(&entries, now, window_days);
            tracing::debug!(
                file = %filename,
                blamed = entries.len(),
                recent = recent.len(),
                "filtered blame ranges"
            );
            (!recent.is_empty()).then_some((filename, recent))
        })
        .collect()
}
