/// Errors that can occur anywhere in a churn run.
///
/// Library crates return this type directly; the binary converts it to a
/// `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use prchurn_core::ChurnError;
///
/// let err = ChurnError::Parse("invalid hunk header: @@ -x @@".into());
/// assert!(err.to_string().contains("@@ -x @@"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ChurnError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(prchurn::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(prchurn::config),
        help("check .prchurn.toml and the command-line flags")
    )]
    Config(String),

    /// Local git repository failure.
    #[error("git error: {0}")]
    #[diagnostic(code(prchurn::git))]
    Git(String),

    /// GitHub REST or GraphQL failure, including non-success HTTP statuses.
    #[error("GitHub error: {0}")]
    #[diagnostic(
        code(prchurn::github),
        help("verify the token can read the repository and that owner, repo and branch exist")
    )]
    GitHub(String),

    /// Malformed diff or blame data.
    #[error("parse error: {0}")]
    #[diagnostic(code(prchurn::parse))]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(prchurn::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(prchurn::toml))]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ChurnError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn github_error_displays_message() {
        let err = ChurnError::GitHub("404 Not Found".into());
        assert_eq!(err.to_string(), "GitHub error: 404 Not Found");
    }

    #[test]
    fn diagnostic_code_is_set() {
        use miette::Diagnostic;

        let err = ChurnError::Config("no token".into());
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("prchurn::config"));
    }
}
