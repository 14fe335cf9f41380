//! Job orchestration for commitlog
//!
//! This crate provides:
//! - The `CommitLog` application: start jobs, poll status, check out snapshots
//! - A bounded worker pool collecting per-test coverage through a memo cache
//! - Sequential snapshot construction (merge, prune, eliminate, render)
//! - Collaborator traits for test runners and source stores
//! - Engine configuration

pub mod app;
pub mod config;
pub mod error;
pub mod pool;
pub mod runner;
pub mod snapshot;

// Re-exports
pub use app::{CommitLog, JobConfig};
pub use config::{EngineConfig, CONFIG_FILE};
pub use error::JobError;
pub use pool::{CoverageCache, CoveragePool};
pub use runner::{FsSourceStore, SourceStore, TestRunner};
pub use snapshot::SnapshotBuilder;
