use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use prchurn_core::{
    BlameEntry, BlameErrorPolicy, ChurnError, ChurnReport, FileChangeSet, HistoryConfig, PrFile,
    SkippedFile,
};
use prchurn_difflens::filter::{FilterResult, PathFilter};
use prchurn_difflens::parser::extract_changed_ranges;
use prchurn_gitpulse::churn::churn_breakdown;
use prchurn_gitpulse::window::recent_change_set;

use crate::source::{BlameSource, PullRequestSource};

/// Knobs for one churn run.
///
/// # Examples
///
/// ```
/// use prchurn_core::HistoryConfig;
/// use prchurn_review::pipeline::PipelineOptions;
///
/// let options = PipelineOptions::from_config(&HistoryConfig::default());
/// assert_eq!(options.window_days, 90);
/// assert_eq!(options.branch, "main");
/// ```
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Destination branch to blame.
    pub branch: String,
    /// Recency window in calendar days, inclusive.
    pub window_days: u32,
    /// Maximum blame fetches in flight.
    pub concurrency: usize,
    /// Repeat every blame fetch once per contributor.
    pub refetch_per_contributor: bool,
    /// What a failed blame fetch does to the run.
    pub on_blame_error: BlameErrorPolicy,
    /// Reference instant for the recency window.
    pub now: DateTime<Utc>,
}

impl PipelineOptions {
    /// Options from `[history]`, with the window anchored at the current time.
    pub fn from_config(history: &HistoryConfig) -> Self {
        Self {
            branch: history.branch.clone(),
            window_days: history.window_days,
            concurrency: history.concurrency,
            refetch_per_contributor: history.refetch_per_contributor,
            on_blame_error: history.on_blame_error,
            now: Utc::now(),
        }
    }

    /// Anchor the recency window at `now` instead of the current time.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Scores a pull request against destination-branch history.
///
/// Stages: list PR files, drop excluded paths, extract the pre-image ranges
/// each patch rewrites, blame every file that has any, keep the recent blame
/// ranges, and intersect the two sides per file.
pub struct ChurnPipeline<'a, B> {
    blame: &'a B,
    options: PipelineOptions,
    filter: PathFilter,
    progress: Option<ProgressBar>,
}

impl<'a, B: BlameSource> ChurnPipeline<'a, B> {
    /// Create a pipeline that blames through `blame`.
    pub fn new(blame: &'a B, options: PipelineOptions) -> Self {
        Self {
            blame,
            options,
            filter: PathFilter::default(),
            progress: None,
        }
    }

    /// Exclude files matching `filter` from the score.
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Advance `progress` once per blamed file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Options this pipeline runs with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Score PR `pr_number` as listed by `prs`.
    ///
    /// # Errors
    ///
    /// Fails if the file list cannot be fetched, a patch is malformed, or a
    /// blame fetch fails under [`BlameErrorPolicy::Abort`].
    pub async fn compute_churn<P: PullRequestSource>(
        &self,
        prs: &P,
        pr_number: u64,
    ) -> Result<ChurnReport, ChurnError> {
        let files = prs.fetch_pr_files(pr_number).await?;
        tracing::info!(pr = pr_number, files = files.len(), "scoring pull request");
        self.score_files(files).await
    }

    /// Score an already listed set of PR files.
    ///
    /// # Errors
    ///
    /// Same as [`ChurnPipeline::compute_churn`], minus the listing step.
    pub async fn score_files(&self, files: Vec<PrFile>) -> Result<ChurnReport, ChurnError> {
        let FilterResult { kept, excluded } = self.filter.filter(files);

        let mut pr_changes = FileChangeSet::new();
        let mut targets: Vec<(String, String)> = Vec::new();
        for file in &kept {
            let Some(patch) = file.patch.as_deref() else {
                tracing::debug!(file = %file.filename, "no patch, skipping");
                continue;
            };
            let ranges = extract_changed_ranges(patch).map_err(|e| {
                ChurnError::Parse(format!("patch for {} is malformed: {e}", file.filename))
            })?;
            if ranges.is_empty() {
                tracing::debug!(file = %file.filename, "pure addition, nothing to blame");
                continue;
            }
            if !pr_changes.contains_key(&file.filename) {
                targets.push((file.filename.clone(), file.blame_path().to_string()));
            }
            pr_changes
                .entry(file.filename.clone())
                .or_default()
                .extend(ranges);
        }

        let passes = self.blame_passes().await?;
        let (history, skipped) = self.fetch_history(targets, passes).await?;
        let recent = recent_change_set(history, self.options.now, self.options.window_days);
        let breakdown = churn_breakdown(&pr_changes, &recent);

        Ok(ChurnReport::new(breakdown, skipped, excluded))
    }

    async fn blame_passes(&self) -> Result<usize, ChurnError> {
        if !self.options.refetch_per_contributor {
            return Ok(1);
        }
        let contributors = self.blame.list_contributors().await?;
        if contributors.is_empty() {
            tracing::warn!("no contributors listed, fetching blame once per file");
            return Ok(1);
        }
        tracing::debug!(passes = contributors.len(), "repeating blame per contributor");
        Ok(contributors.len())
    }

    async fn fetch_history(
        &self,
        targets: Vec<(String, String)>,
        passes: usize,
    ) -> Result<(Vec<(String, Vec<BlameEntry>)>, Vec<SkippedFile>), ChurnError> {
        if let Some(pb) = &self.progress {
            pb.set_length(targets.len() as u64);
        }

        let mut fetches = stream::iter(targets)
            .map(move |(filename, path)| async move {
                let result = self.fetch_blame(&path, passes).await;
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
                (filename, result)
            })
            .buffer_unordered(self.options.concurrency.max(1));

        let mut history = Vec::new();
        let mut skipped = Vec::new();
        while let Some((filename, result)) = fetches.next().await {
            match result {
                Ok(entries) => history.push((filename, entries)),
                Err(e) if self.options.on_blame_error == BlameErrorPolicy::Skip => {
                    tracing::warn!(file = %filename, error = %e, "blame failed, leaving file out");
                    skipped.push(SkippedFile {
                        filename,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    if let Some(pb) = &self.progress {
                        pb.finish_and_clear();
                    }
                    return Err(e);
                }
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        skipped.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok((history, skipped))
    }

    async fn fetch_blame(&self, path: &str, passes: usize) -> Result<Vec<BlameEntry>, ChurnError> {
        let mut entries = Vec::new();
        for pass in 1..=passes {
            entries = self
                .blame
                .fetch_blame_ranges(path, &self.options.branch)
                .await?;
            tracing::trace!(file = path, pass, ranges = entries.len(), "blame fetched");
        }
        Ok(entries)
    }
}
