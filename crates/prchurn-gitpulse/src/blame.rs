//! Destination-branch blame from a local clone via git2.
//!
//! Produces the same [`BlameEntry`] ranges the GitHub GraphQL blame query
//! returns, so a churn run can use a checked-out repository instead of the
//! API for the history side.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use git2::{BlameOptions, Repository};
use prchurn_core::{BlameEntry, ChurnError, Interval};

/// Blame lookups against a repository on disk.
///
/// # Examples
///
/// ```no_run
/// use prchurn_gitpulse::blame::LocalBlame;
///
/// let blame = LocalBlame::new(".");
/// let entries = blame.blame_file("src/main.rs", "main").unwrap();
/// for e in &entries {
///     println!("{} {}", e.range, e.committed_date);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBlame {
    repo_path: PathBuf,
}

impl LocalBlame {
    /// Blame against the repository at `repo_path`.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Repository location.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Blame `path` at the tip of `branch`.
    ///
    /// Each returned entry covers one blame hunk and carries the committer
    /// date of the commit that last touched it.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Git`] if the repository cannot be opened, the
    /// branch cannot be resolved, or the file does not exist on it.
    pub fn blame_file(&self, path: &str, branch: &str) -> Result<Vec<BlameEntry>, ChurnError> {
        let repo = Repository::open(&self.repo_path)
            .map_err(|e| ChurnError::Git(format!("failed to open repository: {e}")))?;

        let tip = repo
            .resolve_reference_from_short_name(branch)
            .and_then(|reference| reference.peel_to_commit())
            .map_err(|e| ChurnError::Git(format!("failed to resolve branch '{branch}': {e}")))?;

        let mut opts = BlameOptions::new();
        opts.newest_commit(tip.id());

        let blame = repo
            .blame_file(Path::new(path), Some(&mut opts))
            .map_err(|e| ChurnError::Git(format!("failed to blame {path} at {branch}: {e}")))?;

        let mut entries = Vec::with_capacity(blame.len());
        for hunk in blame.iter() {
            let lines = hunk.lines_in_hunk() as u32;
            if lines == 0 {
                continue;
            }
            let start = hunk.final_start_line() as u32;

            let commit = repo
                .find_commit(hunk.final_commit_id())
                .map_err(|e| ChurnError::Git(format!("failed to find commit: {e}")))?;
            // UTC, matching GitHub's `committedDate`; the committer's offset is ignored.
            let seconds = commit.time().seconds();
            let committed_date = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
                ChurnError::Git(format!("commit {} has invalid time {seconds}", commit.id()))
            })?;

            entries.push(BlameEntry {
                range: Interval::try_new(start, start + lines - 1)?,
                committed_date,
            });
        }

        tracing::debug!(file = path, branch, ranges = entries.len(), "local blame");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use git2::{Signature, Time};

    use super::*;

    const OLD: i64 = 1_600_000_000;
    const NEW: i64 = 1_700_000_000;

    fn commit_file(repo: &Repository, path: &str, content: &str, when: i64) {
        commit_file_in_zone(repo, path, content, when, 0);
    }

    fn commit_file_in_zone(repo: &Repository, path: &str, content: &str, when: i64, offset: i32) {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(path), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::new("dev", "dev@example.com", &Time::new(when, offset)).unwrap();
        let parent = repo
            .find_reference("refs/heads/main")
            .ok()
            .and_then(|r| r.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("refs/heads/main"), &sig, &sig, "change", &tree, &parents)
            .unwrap();
    }

    #[test]
    fn blame_attributes_lines_to_their_commits() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "lib.rs", "one\ntwo\nthree\nfour\n", OLD);
        commit_file(&repo, "lib.rs", "one\nTWO\nTHREE\nfour\n", NEW);

        let entries = LocalBlame::new(dir.path()).blame_file("lib.rs", "main").unwrap();

        let mut by_range: Vec<(u32, u32, i64)> = entries
            .iter()
            .map(|e| (e.range.start(), e.range.end(), e.committed_date.timestamp()))
            .collect();
        by_range.sort();
        assert_eq!(by_range, vec![(1, 1, OLD), (2, 3, NEW), (4, 4, OLD)]);
        assert_eq!(
            entries.iter().map(|e| e.range.len()).sum::<u64>(),
            4,
            "every line is attributed exactly once"
        );
        assert!(entries
            .iter()
            .any(|e| e.committed_date == Utc.timestamp_opt(NEW, 0).unwrap()));
    }

    #[test]
    fn committed_date_is_utc_regardless_of_committer_offset() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        // 2024-03-01 20:00 UTC is already 2024-03-02 in UTC+09:00.
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        commit_file_in_zone(&repo, "lib.rs", "one\n", when.timestamp(), 540);

        let entries = LocalBlame::new(dir.path()).blame_file("lib.rs", "main").unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].committed_date, when);
        assert_eq!(
            entries[0].committed_date.date_naive(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn missing_branch_is_a_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "lib.rs", "one\n", OLD);

        let err = LocalBlame::new(dir.path())
            .blame_file("lib.rs", "does-not-exist")
            .unwrap_err();
        assert!(matches!(err, ChurnError::Git(_)));
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[test]
    fn missing_file_is_a_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "lib.rs", "one\n", OLD);

        let err = LocalBlame::new(dir.path())
            .blame_file("absent.rs", "main")
            .unwrap_err();
        assert!(matches!(err, ChurnError::Git(_)));
    }

    #[test]
    fn not_a_repository_is_a_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalBlame::new(dir.path()).blame_file("x", "main").unwrap_err();
        assert!(err.to_string().contains("failed to open repository"));
    }
}
