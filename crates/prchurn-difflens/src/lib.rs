//! Unified-diff parsing into pre-image line ranges.
//!
//! Turns the `patch` text GitHub reports for each PR file (or a local
//! `git diff`) into the line ranges of the original file that the change
//! deletes or replaces, and filters out files that should not be scored.

pub mod filter;
pub mod parser;
