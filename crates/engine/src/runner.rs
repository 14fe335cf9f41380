//! External collaborators of the orchestrator
//!
//! Running tests and touching the filesystem happen behind these traits so
//! jobs can be driven by fakes in tests and by recorded data in the CLI.

use anyhow::{Context, Result};
use async_trait::async_trait;
use cl_core::CoverageProfile;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces coverage for a single test
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run `test` of `pkg` in isolation and report the coverage it produced
    async fn coverage(&self, pkg: &str, test: &str) -> Result<Vec<CoverageProfile>>;
}

/// Reads and writes the sources named by coverage profiles
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Turn a coverage file id into a path that `read` and `write` accept
    async fn resolve(&self, pkg: &str, file: &str) -> Result<String>;

    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    async fn write(&self, path: &str, contents: &[u8]) -> Result<()>;
}

/// Sources on the local filesystem below a root directory
#[derive(Debug, Clone)]
pub struct FsSourceStore {
    root: PathBuf,
}

impl FsSourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate locations for a coverage file id, most specific first
    fn candidates(&self, pkg: &str, file: &str) -> Vec<PathBuf> {
        let path = Path::new(file);
        if path.is_absolute() {
            return vec![path.to_path_buf()];
        }

        let mut out = vec![self.root.join(path)];
        if let Some(name) = path.file_name() {
            out.push(self.root.join(pkg).join(name));
        }
        out
    }
}

#[async_trait]
impl SourceStore for FsSourceStore {
    async fn resolve(&self, pkg: &str, file: &str) -> Result<String> {
        for candidate in self.candidates(pkg, file) {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                debug!("resolved {} to {}", file, candidate.display());
                return Ok(candidate.to_string_lossy().into_owned());
            }
        }

        anyhow::bail!(
            "can't find {} for package {} under {}",
            file,
            pkg,
            self.root.display()
        )
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path))
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path))
    }
}
