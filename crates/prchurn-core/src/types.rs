use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChurnError;

/// A closed, inclusive range of 1-indexed line numbers.
///
/// The numbering space depends on where the interval came from: pre-image
/// line numbers for ranges parsed out of a PR patch, destination-branch
/// line numbers for ranges taken from blame.
///
/// # Examples
///
/// ```
/// use prchurn_core::Interval;
///
/// let range = Interval::new(3, 5);
/// assert_eq!(range.len(), 3);
/// assert!(Interval::try_new(5, 3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Interval {
    start: u32,
    end: u32,
}

impl Interval {
    /// Create an interval.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`. Use [`Interval::try_new`] for untrusted input.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "interval start {start} is after end {end}");
        Self { start, end }
    }

    /// Create an interval, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Parse`] when the bounds are reversed.
    pub fn try_new(start: u32, end: u32) -> Result<Self, ChurnError> {
        if start > end {
            return Err(ChurnError::Parse(format!(
                "invalid line range {start}..={end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// First line of the range.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last line of the range (inclusive).
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of line positions covered.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Lines a PR deletes or replaces, keyed by filename, in pre-image numbering.
pub type FileChangeSet = BTreeMap<String, Vec<Interval>>;

/// Lines recently changed on the destination branch, keyed by filename.
///
/// Files without any qualifying range are absent rather than mapped to an
/// empty list.
pub type RecentChangeSet = BTreeMap<String, Vec<Interval>>;

/// Attribution of a contiguous line range at the destination branch head to
/// the commit that last touched it.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use prchurn_core::{BlameEntry, Interval};
///
/// let entry = BlameEntry {
///     range: Interval::new(10, 14),
///     committed_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
/// };
/// assert_eq!(entry.range.len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameEntry {
    /// Lines covered by this attribution.
    pub range: Interval,
    /// Commit date of the attributed commit.
    pub committed_date: DateTime<Utc>,
}

/// One file touched by a pull request, as listed by the PR files endpoint
/// or split out of a local unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrFile {
    /// Path in the PR head.
    pub filename: String,
    /// Path on the destination branch when the file was renamed.
    #[serde(default)]
    pub previous_filename: Option<String>,
    /// `added`, `removed`, `modified`, `renamed`, ...
    #[serde(default)]
    pub status: String,
    /// Unified-diff hunks for this file. Absent for binary or oversized files.
    #[serde(default)]
    pub patch: Option<String>,
}

impl PrFile {
    /// Path to look the file up under on the destination branch.
    pub fn blame_path(&self) -> &str {
        self.previous_filename.as_deref().unwrap_or(&self.filename)
    }
}

/// A GitHub repository coordinate.
///
/// # Examples
///
/// ```
/// use prchurn_core::RepoRef;
///
/// let repo: RepoRef = "octocat/hello-world".parse().unwrap();
/// assert_eq!(repo.owner, "octocat");
/// assert_eq!(repo.to_string(), "octocat/hello-world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owning user or organisation.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoRef {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(ChurnError::Config(format!(
                "invalid repository '{s}', expected owner/repo"
            ))),
        }
    }
}

/// Overlap found for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChurn {
    /// File path.
    pub filename: String,
    /// Ranges the PR deletes or replaces.
    pub changed: Vec<Interval>,
    /// Ranges recently changed on the destination branch.
    pub recent: Vec<Interval>,
    /// Intersection of `changed` and `recent`.
    pub overlap: Vec<Interval>,
    /// Total line positions in `overlap`.
    pub overlapping_lines: u64,
}

/// A file left out of the score because its history could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    /// File path.
    pub filename: String,
    /// Error that caused the skip.
    pub reason: String,
}

/// Result of a churn run.
///
/// # Examples
///
/// ```
/// use prchurn_core::ChurnReport;
///
/// let report = ChurnReport::new(vec![], vec![], vec![]);
/// assert_eq!(report.total, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnReport {
    /// Overlapping line positions summed over all files.
    pub total: u64,
    /// Files present on both sides, sorted by filename.
    pub files: Vec<FileChurn>,
    /// Files whose history fetch failed and was skipped.
    pub skipped: Vec<SkippedFile>,
    /// Files excluded by `filter.skip_patterns`.
    pub excluded: Vec<String>,
}

impl ChurnReport {
    /// Build a report, deriving `total` from the per-file counts.
    pub fn new(files: Vec<FileChurn>, skipped: Vec<SkippedFile>, excluded: Vec<String>) -> Self {
        let total = files.iter().map(|f| f.overlapping_lines).sum();
        Self {
            total,
            files,
            skipped,
            excluded,
        }
    }
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use prchurn_core::OutputFormat;
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Score followed by a per-file table.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// GitHub-flavored Markdown, suitable for a PR comment.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
