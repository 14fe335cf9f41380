//! Job status records and their store
//!
//! A job entry is created when the job starts, rewritten with progress
//! details while it runs, and frozen once it completes or fails. All
//! transitions go through [`Cache::update`], so a late progress write can
//! never overwrite a finished entry.

use crate::cache::{Cache, CacheError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// File contents of one snapshot, keyed by path
pub type Snapshot = BTreeMap<String, Vec<u8>>;

/// Output of a finished job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Tests in the order snapshots were built
    pub tests: Vec<String>,
    /// One snapshot per test, then the unmodified sources
    #[serde(with = "base64_snapshots")]
    pub files: Vec<Snapshot>,
}

impl JobResult {
    /// Snapshot holding the unmodified sources
    pub fn final_snapshot(&self) -> Option<&Snapshot> {
        self.files.last()
    }
}

/// Status record stored per job id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCacheEntry {
    pub complete: bool,
    pub details: String,
    pub error: Option<String>,
    pub results: Option<JobResult>,
}

impl JobCacheEntry {
    pub const INITIAL_DETAILS: &'static str = "Initializing job";

    pub fn running(details: impl Into<String>) -> Self {
        Self {
            complete: false,
            details: details.into(),
            error: None,
            results: None,
        }
    }

    pub fn succeeded(results: JobResult) -> Self {
        Self {
            complete: true,
            details: String::new(),
            error: None,
            results: Some(results),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            complete: true,
            details: String::new(),
            error: Some(error.into()),
            results: None,
        }
    }

    /// Lifecycle state described by this entry
    pub fn state(&self) -> JobState {
        match (self.complete, &self.error, &self.results) {
            (true, Some(error), _) => JobState::Failed(error.clone()),
            (true, None, Some(results)) => JobState::Complete(results.clone()),
            (true, None, None) => JobState::Complete(JobResult::default()),
            (false, _, _) if self.details == Self::INITIAL_DETAILS => JobState::Initializing,
            (false, _, _) => JobState::Running(self.details.clone()),
        }
    }
}

/// Job lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Initializing,
    Running(String),
    Complete(JobResult),
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Running(details) => write!(f, "running: {}", details),
            Self::Complete(results) => write!(f, "complete ({} snapshots)", results.files.len()),
            Self::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

/// Job status table backed by a cache actor
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    cache: Cache<JobCacheEntry>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_cache(Cache::new())
    }

    pub fn with_cache(cache: Cache<JobCacheEntry>) -> Self {
        Self { cache }
    }

    /// Record a freshly started job
    pub fn begin(&self, id: &str) -> Result<(), CacheError> {
        debug!("job {} started", id);
        self.cache
            .write(id, JobCacheEntry::running(JobCacheEntry::INITIAL_DETAILS))
    }

    /// Replace the progress details of a running job
    pub fn progress(&self, id: &str, details: impl Into<String>) -> Result<(), CacheError> {
        let details = details.into();
        debug!("job {}: {}", id, details);
        self.cache.update(id, move |current| match current {
            Some(entry) if entry.complete => None,
            _ => Some(JobCacheEntry::running(details)),
        })
    }

    /// Store the results of a finished job
    pub fn complete(&self, id: &str, results: JobResult) -> Result<(), CacheError> {
        info!(
            "job {} complete with {} snapshots",
            id,
            results.files.len()
        );
        self.finish(id, JobCacheEntry::succeeded(results))
    }

    /// Record a job failure
    pub fn fail(&self, id: &str, error: impl fmt::Display) -> Result<(), CacheError> {
        let error = format!("{:#}", error);
        warn!("job {} failed: {}", id, error);
        self.finish(id, JobCacheEntry::failed(error))
    }

    fn finish(&self, id: &str, entry: JobCacheEntry) -> Result<(), CacheError> {
        self.cache.update(id, move |current| match current {
            Some(existing) if existing.complete => None,
            _ => Some(entry),
        })
    }

    /// Current entry for `id`; `None` for unknown jobs
    pub async fn status(&self, id: &str) -> Result<Option<JobCacheEntry>, CacheError> {
        self.cache.read(id).await
    }
}

/// Snapshot bytes travel as base64 strings
mod base64_snapshots {
    use super::Snapshot;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(files: &[Snapshot], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<BTreeMap<&str, String>> = files
            .iter()
            .map(|snapshot| {
                snapshot
                    .iter()
                    .map(|(path, bytes)| (path.as_str(), STANDARD.encode(bytes)))
                    .collect()
            })
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Snapshot>, D::Error> {
        let encoded = Vec::<BTreeMap<String, String>>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|snapshot| {
                snapshot
                    .into_iter()
                    .map(|(path, text)| {
                        STANDARD
                            .decode(text.as_bytes())
                            .map(|bytes| (path, bytes))
                            .map_err(D::Error::custom)
                    })
                    .collect()
            })
            .collect()
    }
}
