//! Path filtering before scoring.
//!
//! Lets a repository exclude lock files, vendored code, fixtures and the
//! like from the churn score with glob patterns from `[filter]`.

use prchurn_core::{ChurnError, FilterConfig, PrFile};

/// Glob-based file exclusion.
///
/// # Examples
///
/// ```
/// use prchurn_core::FilterConfig;
/// use prchurn_difflens::filter::PathFilter;
///
/// let config = FilterConfig { skip_patterns: vec!["*.lock".into()] };
/// let filter = PathFilter::from_config(&config).unwrap();
/// assert!(filter.should_skip("Cargo.lock"));
/// assert!(!filter.should_skip("src/main.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    skip_patterns: Vec<glob::Pattern>,
}

/// Files kept for scoring and paths excluded by a pattern.
#[derive(Debug, Clone, Default)]
pub struct FilterResult {
    /// Files to score.
    pub kept: Vec<PrFile>,
    /// Filenames matched by a skip pattern.
    pub excluded: Vec<String>,
}

impl PathFilter {
    /// Build a filter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] naming the first invalid pattern.
    pub fn from_config(config: &FilterConfig) -> Result<Self, ChurnError> {
        let skip_patterns = config
            .skip_patterns
            .iter()
            .map(|pat| {
                glob::Pattern::new(pat)
                    .map_err(|e| ChurnError::Config(format!("invalid skip pattern '{pat}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { skip_patterns })
    }

    /// Whether `path` matches any skip pattern.
    pub fn should_skip(&self, path: &str) -> bool {
        self.skip_patterns.iter().any(|pat| pat.matches(path))
    }

    /// Partition PR files into kept and excluded.
    pub fn filter(&self, files: Vec<PrFile>) -> FilterResult {
        let mut result = FilterResult::default();

        for file in files {
            if self.should_skip(&file.filename) {
                tracing::debug!(file = %file.filename, "excluded by skip pattern");
                result.excluded.push(file.filename);
            } else {
                result.kept.push(file);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> PrFile {
        PrFile {
            filename: name.into(),
            previous_filename: None,
            status: "modified".into(),
            patch: None,
        }
    }

    fn filter(patterns: &[&str]) -> PathFilter {
        PathFilter::from_config(&FilterConfig {
            skip_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let result = PathFilter::default().filter(vec![file("a.rs"), file("Cargo.lock")]);
        assert_eq!(result.kept.len(), 2);
        assert!(result.excluded.is_empty());
    }

    #[test]
    fn patterns_exclude_matching_files() {
        let result = filter(&["*.lock", "vendor/**"]).filter(vec![
            file("Cargo.lock"),
            file("vendor/dep/lib.js"),
            file("src/lib.rs"),
        ]);
        assert_eq!(result.excluded, vec!["Cargo.lock", "vendor/dep/lib.js"]);
        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.kept[0].filename, "src/lib.rs");
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = PathFilter::from_config(&FilterConfig {
            skip_patterns: vec!["[".into()],
        })
        .unwrap_err();
        assert!(matches!(err, ChurnError::Config(_)));
        assert!(err.to_string().contains("'['"));
    }
}
