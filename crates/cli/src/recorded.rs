//! Test runner replaying recorded coverage
//!
//! Profiles are read from `<dir>/<pkg>/<test>.json`, each file holding the
//! JSON array of coverage profiles one test run produced.

use anyhow::{Context, Result};
use async_trait::async_trait;
use cl_core::CoverageProfile;
use engine::TestRunner;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RecordedRunner {
    dir: PathBuf,
}

impl RecordedRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the recorded coverage of one test
    pub fn profile_path(&self, pkg: &str, test: &str) -> PathBuf {
        self.dir.join(pkg).join(format!("{}.json", test))
    }
}

#[async_trait]
impl TestRunner for RecordedRunner {
    async fn coverage(&self, pkg: &str, test: &str) -> Result<Vec<CoverageProfile>> {
        let path = self.profile_path(pkg, test);
        debug!("replaying coverage from {}", path.display());

        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("No recorded coverage at {}", path.display()))?;

        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse coverage in {}", path.display()))
    }
}
