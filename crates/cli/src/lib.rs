//! Library half of the commitlog command line tool
//!
//! This crate provides:
//! - A test runner replaying recorded coverage profiles
//! - Loading and saving job status records
//! - Coloured diffs between snapshots

pub mod diff_utils;
pub mod recorded;
pub mod results;

// Re-exports
pub use recorded::RecordedRunner;
