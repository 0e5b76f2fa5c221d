//! Core types, configuration, and error handling for prchurn.
//!
//! Shared foundation for the other prchurn crates:
//! - [`ChurnError`]: unified error type using `thiserror`
//! - [`ChurnConfig`]: configuration loaded from `.prchurn.toml`
//! - Shared types: [`Interval`], [`BlameEntry`], [`PrFile`], [`ChurnReport`]

mod config;
mod error;
mod types;

pub use config::{BlameErrorPolicy, ChurnConfig, FilterConfig, GitHubConfig, HistoryConfig};
pub use error::ChurnError;
pub use types::{
    BlameEntry, ChurnReport, FileChangeSet, FileChurn, Interval, OutputFormat, PrFile,
    RecentChangeSet, RepoRef, SkippedFile,
};

/// A convenience `Result` type for prchurn operations.
pub type Result<T> = std::result::Result<T, ChurnError>;
