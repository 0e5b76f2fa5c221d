//! Destination-branch history and overlap scoring.
//!
//! Filters blame ranges to a recency window, intersects them with the
//! ranges a pull request rewrites, and sums the overlap into a churn score.
//! Blame can come from the GitHub API or from a local clone via git2.

pub mod blame;
pub mod churn;
pub mod overlap;
pub mod window;
