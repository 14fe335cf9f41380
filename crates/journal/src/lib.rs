//! Job status and memoization stores
//!
//! This crate provides:
//! - A message-passing cache actor (read, write, update, delete)
//! - Job status records, results and lifecycle states
//! - A job store that freezes entries once they finish

pub mod cache;
pub mod job;

// Re-exports
pub use cache::{Cache, CacheError};
pub use job::{JobCacheEntry, JobResult, JobState, JobStore, Snapshot};
