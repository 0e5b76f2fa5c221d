//! Churn run orchestration.
//!
//! Fetches PR files and destination-branch blame (GitHub or local), and
//! drives them through the difflens and gitpulse stages into a
//! [`ChurnReport`](prchurn_core::ChurnReport).

pub mod github;
pub mod pipeline;
pub mod report;
pub mod source;
