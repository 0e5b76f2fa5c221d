use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChurnError;

/// Top-level configuration loaded from `.prchurn.toml`.
///
/// Resolution order is CLI flags > config file > defaults; the binary
/// applies flags on top of what this type loads. Environment variables are
/// read only for the GitHub token.
///
/// # Examples
///
/// ```
/// use prchurn_core::ChurnConfig;
///
/// let config = ChurnConfig::default();
/// assert_eq!(config.history.window_days, 90);
/// assert_eq!(config.history.branch, "main");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// GitHub connection settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Destination-branch history settings.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Files to leave out of the score.
    #[serde(default)]
    pub filter: FilterConfig,
}

impl ChurnConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Io`] if the file cannot be read, or
    /// [`ChurnError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ChurnError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use prchurn_core::ChurnConfig;
    ///
    /// let config = ChurnConfig::from_toml("[history]\nwindow_days = 30\n").unwrap();
    /// assert_eq!(config.history.window_days, 30);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ChurnError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// GitHub connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Repository owner, used when `--owner` is not given.
    pub owner: Option<String>,
    /// Repository name, used when `--repo` is not given.
    pub repo: Option<String>,
    /// REST API root. GraphQL is derived from it.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            api_url: default_api_url(),
        }
    }
}

/// What to do when the blame for a single file cannot be fetched.
///
/// # Examples
///
/// ```
/// use prchurn_core::BlameErrorPolicy;
///
/// let policy: BlameErrorPolicy = "skip".parse().unwrap();
/// assert_eq!(policy, BlameErrorPolicy::Skip);
/// assert_eq!(BlameErrorPolicy::default(), BlameErrorPolicy::Abort);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlameErrorPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log a warning, leave the file out, and list it in the report.
    Skip,
}

impl fmt::Display for BlameErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlameErrorPolicy::Abort => write!(f, "abort"),
            BlameErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for BlameErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(BlameErrorPolicy::Abort),
            "skip" => Ok(BlameErrorPolicy::Skip),
            other => Err(format!("unknown blame error policy: {other}")),
        }
    }
}

/// Destination-branch history configuration.
///
/// # Examples
///
/// ```
/// use prchurn_core::HistoryConfig;
///
/// let config = HistoryConfig::default();
/// assert_eq!(config.concurrency, 4);
/// assert!(!config.refetch_per_contributor);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Blame ranges committed at most this many calendar days ago count as
    /// recent (default: 90).
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Destination branch (default: `main`).
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Maximum blame requests in flight (default: 4).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Repeat each blame fetch once per repository contributor. The result
    /// is identical on every pass; this exists only to reproduce legacy
    /// request volume.
    #[serde(default)]
    pub refetch_per_contributor: bool,
    /// Behaviour when one file's blame fetch fails (default: abort).
    #[serde(default)]
    pub on_blame_error: BlameErrorPolicy,
}

fn default_window_days() -> u32 {
    90
}

fn default_branch() -> String {
    "main".into()
}

fn default_concurrency() -> usize {
    4
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            branch: default_branch(),
            concurrency: default_concurrency(),
            refetch_per_contributor: false,
            on_blame_error: BlameErrorPolicy::default(),
        }
    }
}

/// Path filtering configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Glob patterns; matching files are excluded from the score.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}
