//! Where PR files and blame data come from.
//!
//! The pipeline only sees these two traits, so a run can mix a GitHub PR
//! with a local clone's blame, or score a local diff entirely offline.

use std::future::Future;

use prchurn_core::{BlameEntry, ChurnError, PrFile};
use prchurn_difflens::parser::parse_unified_diff;
use prchurn_gitpulse::blame::LocalBlame;

use crate::github::GitHubClient;

/// Supplies the files a pull request touches.
pub trait PullRequestSource {
    /// All files of PR `pr_number`, with their patches.
    fn fetch_pr_files(
        &self,
        pr_number: u64,
    ) -> impl Future<Output = Result<Vec<PrFile>, ChurnError>> + Send;
}

/// Supplies destination-branch blame.
pub trait BlameSource {
    /// Blame ranges of `path` at the tip of `branch`.
    fn fetch_blame_ranges(
        &self,
        path: &str,
        branch: &str,
    ) -> impl Future<Output = Result<Vec<BlameEntry>, ChurnError>> + Send;

    /// Contributor identities, used only to size repeated blame passes.
    fn list_contributors(&self) -> impl Future<Output = Result<Vec<String>, ChurnError>> + Send {
        async { Ok(Vec::new()) }
    }
}

impl PullRequestSource for GitHubClient {
    async fn fetch_pr_files(&self, pr_number: u64) -> Result<Vec<PrFile>, ChurnError> {
        GitHubClient::fetch_pr_files(self, pr_number).await
    }
}

impl BlameSource for GitHubClient {
    async fn fetch_blame_ranges(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Vec<BlameEntry>, ChurnError> {
        GitHubClient::fetch_blame_ranges(self, path, branch).await
    }

    async fn list_contributors(&self) -> Result<Vec<String>, ChurnError> {
        GitHubClient::list_contributors(self).await
    }
}

impl BlameSource for LocalBlame {
    async fn fetch_blame_ranges(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Vec<BlameEntry>, ChurnError> {
        let blame = self.clone();
        let path = path.to_string();
        let branch = branch.to_string();
        tokio::task::spawn_blocking(move || blame.blame_file(&path, &branch))
            .await
            .map_err(|e| ChurnError::Git(format!("blame task failed: {e}")))?
    }
}

/// A unified diff standing in for a pull request.
///
/// The PR number is ignored; every call returns the files of the diff.
///
/// # Examples
///
/// ```
/// use prchurn_review::source::DiffSource;
///
/// let diff = "\
/// diff --git a/a.py b/a.py
/// --- a/a.py
/// +++ b/a.py
/// @@ -1,3 +1,3 @@
///  line1
/// -line2
/// +line2 changed
///  line3
/// ";
/// let source = DiffSource::parse(diff).unwrap();
/// assert_eq!(source.files()[0].filename, "a.py");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiffSource {
    files: Vec<PrFile>,
}

impl DiffSource {
    /// Parse a `git diff` style unified diff.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Parse`] if a hunk header is malformed.
    pub fn parse(diff: &str) -> Result<Self, ChurnError> {
        let files = parse_unified_diff(diff)?
            .into_iter()
            .map(|patch| patch.into_pr_file())
            .collect();
        Ok(Self { files })
    }

    /// Files found in the diff.
    pub fn files(&self) -> &[PrFile] {
        &self.files
    }
}

impl PullRequestSource for DiffSource {
    async fn fetch_pr_files(&self, _pr_number: u64) -> Result<Vec<PrFile>, ChurnError> {
        Ok(self.files.clone())
    }
}
