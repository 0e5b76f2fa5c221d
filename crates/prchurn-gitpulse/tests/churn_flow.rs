use chrono::{Duration, TimeZone, Utc};
use prchurn_core::{BlameEntry, FileChangeSet, Interval};
use prchurn_gitpulse::churn::{churn_breakdown, compute_churn};
use prchurn_gitpulse::window::recent_change_set;

#[test]
fn recent_history_overlapping_a_replacement_scores_its_lines() {
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
    let blamed = |start, end, days| BlameEntry {
        range: Interval::new(start, end),
        committed_date: now - Duration::days(days),
    };

    let pr = FileChangeSet::from([
        ("src/api.rs".to_string(), vec![Interval::new(10, 14), Interval::new(40, 41)]),
        ("src/new.rs".to_string(), vec![]),
        ("README.md".to_string(), vec![Interval::new(1, 3)]),
    ]);

    let history = vec![
        (
            "src/api.rs".to_string(),
            vec![blamed(1, 11, 200), blamed(12, 20, 10), blamed(21, 45, 30)],
        ),
        ("README.md".to_string(), vec![blamed(1, 50, 365)]),
    ];
    let recent = recent_change_set(history, now, 90);

    assert!(!recent.contains_key("README.md"));
    assert_eq!(
        recent["src/api.rs"],
        vec![Interval::new(12, 20), Interval::new(21, 45)]
    );

    // 12..=14 and 40..=41
    assert_eq!(compute_churn(&pr, &recent), 5);

    let files = churn_breakdown(&pr, &recent);
    assert_eq!(files.len(), 1);
    assert_eq!(
        files[0].overlap,
        vec![Interval::new(12, 14), Interval::new(40, 41)]
    );
}
