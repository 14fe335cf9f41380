//! Job failure taxonomy

use journal::CacheError;
use thiserror::Error;

/// Reasons a job ends in the failed state
///
/// Collaborator failures keep their `anyhow` chain and print it in full,
/// since the message is all a polling client ever sees.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("coverage collection failed for {test}: {cause:#}")]
    Coverage { test: String, cause: anyhow::Error },

    #[error("cannot load source {file}: {cause:#}")]
    Source { file: String, cause: anyhow::Error },

    #[error("cannot parse {file}: {cause:#}")]
    Parse { file: String, cause: anyhow::Error },

    #[error("cannot render {file}: {cause:#}")]
    Render { file: String, cause: anyhow::Error },

    #[error("unknown job {0}")]
    UnknownJob(String),

    #[error("no coverage recorded for {0}")]
    MissingProfile(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("coverage worker stopped unexpectedly: {0}")]
    Worker(String),
}
