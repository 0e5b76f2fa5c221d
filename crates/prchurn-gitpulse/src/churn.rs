//! Churn score: PR-changed lines that were also changed recently.

use prchurn_core::{FileChangeSet, FileChurn, RecentChangeSet};

use crate::overlap::{coalesce, intersect, total_lines};

/// Per-file overlap for every file present in both maps, sorted by
/// filename.
///
/// Each side is coalesced before intersecting, so overlapping or repeated
/// ranges (duplicate blame data, ranges from neighbouring hunks) are counted
/// once. Files present on only one side do not appear.
pub fn churn_breakdown(pr_changes: &FileChangeSet, recent_changes: &RecentChangeSet) -> Vec<FileChurn> {
    pr_changes
        .iter()
        .filter_map(|(filename, changed)| {
            let recent = recent_changes.get(filename)?;
            let changed = coalesce(changed);
            let recent = coalesce(recent);
            let overlap = intersect(&changed, &recent);
            let overlapping_lines = total_lines(&overlap);

            tracing::debug!(file = %filename, overlapping_lines, "computed overlap");

            Some(FileChurn {
                filename: filename.clone(),
                changed,
                recent,
                overlap,
                overlapping_lines,
            })
        })
        .collect()
}

/// Total overlapping line count across all files.
///
/// # Examples
///
/// ```
/// use prchurn_core::{FileChangeSet, Interval, RecentChangeSet};
/// use prchurn_gitpulse::churn::compute_churn;
///
/// let pr = FileChangeSet::from([("a.rs".to_string(), vec![Interval::new(2, 2)])]);
/// let recent = RecentChangeSet::from([("a.rs".to_string(), vec![Interval::new(1, 3)])]);
/// assert_eq!(compute_churn(&pr, &recent), 1);
/// ```
pub fn compute_churn(pr_changes: &FileChangeSet, recent_changes: &RecentChangeSet) -> u64 {
    churn_breakdown(pr_changes, recent_changes)
        .iter()
        .map(|file| file.overlapping_lines)
        .sum()
}

#[cfg(test)]
mod tests {
    use prchurn_core::Interval;

    use super::*;

    fn set(entries: &[(&str, &[(u32, u32)])]) -> FileChangeSet {
        entries
            .iter()
            .map(|(name, ranges)| {
                (
                    name.to_string(),
                    ranges.iter().map(|&(s, e)| Interval::new(s, e)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn single_file_overlap() {
        let pr = set(&[("a.rs", &[(2, 2)])]);
        let recent = set(&[("a.rs", &[(1, 3)])]);
        assert_eq!(compute_churn(&pr, &recent), 1);
    }

    #[test]
    fn one_sided_files_contribute_nothing() {
        let pr = set(&[("only_pr.rs", &[(1, 50)]), ("both.rs", &[(10, 19)])]);
        let recent = set(&[("only_recent.rs", &[(1, 50)]), ("both.rs", &[(15, 30)])]);
        assert_eq!(compute_churn(&pr, &recent), 5);

        let files = churn_breakdown(&pr, &recent);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "both.rs");
        assert_eq!(files[0].overlap, vec![Interval::new(15, 19)]);
    }

    #[test]
    fn totals_sum_across_files() {
        let pr = set(&[("a.rs", &[(1, 10)]), ("b.rs", &[(5, 5), (8, 9)])]);
        let recent = set(&[("a.rs", &[(3, 4), (9, 20)]), ("b.rs", &[(1, 100)])]);
        assert_eq!(compute_churn(&pr, &recent), 4 + 3);
    }

    #[test]
    fn duplicated_recent_ranges_count_once() {
        let pr = set(&[("a.rs", &[(1, 10)])]);
        let recent = set(&[("a.rs", &[(2, 3), (2, 3), (2, 3)])]);
        assert_eq!(compute_churn(&pr, &recent), 2);
    }

    #[test]
    fn overlapping_pr_ranges_count_once() {
        let pr = set(&[("a.rs", &[(5, 8), (1, 6)])]);
        let recent = set(&[("a.rs", &[(1, 20)])]);
        assert_eq!(compute_churn(&pr, &recent), 8);
    }

    #[test]
    fn files_with_zero_overlap_are_reported() {
        let pr = set(&[("a.rs", &[(1, 2)])]);
        let recent = set(&[("a.rs", &[(10, 12)])]);
        let files = churn_breakdown(&pr, &recent);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].overlapping_lines, 0);
        assert!(files[0].overlap.is_empty());
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(compute_churn(&FileChangeSet::new(), &RecentChangeSet::new()), 0);
    }
}
