//! Coverage model and test ordering for commitlog
//!
//! This crate provides:
//! - Coverage spans and per-file profiles
//! - The profile merge algorithm and its coverage gain
//! - Line counting over profile sets
//! - Test ordering strategies (hardcoded, raw, net, importance)

pub mod coverage;
pub mod order;

// Re-exports
pub use coverage::{
    lines_covered, merge, num_lines_covered, CoverageProfile, CoverageSpan, FileId, Position,
};
pub use order::{OrderKind, TestOrder, TestProfiles, UnknownOrder};
