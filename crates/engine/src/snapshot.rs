//! Per-test snapshot construction
//!
//! Tests are visited in their decided order. Each step folds the test's
//! coverage into everything seen so far, re-parses every covered file,
//! prunes it against the accumulated profile, removes declarations left
//! without users and renders the result. The unmodified sources of all
//! files form the final snapshot.

use crate::config::EngineConfig;
use crate::error::JobError;
use crate::runner::SourceStore;
use cl_core::{merge, CoverageProfile, TestProfiles};
use journal::Snapshot;
use std::collections::BTreeMap;
use syntax::{prune, Eliminator, SyntaxTree, SyntaxTreeProvider, UsageAnalyzer};
use tracing::{debug, info};

/// Builds the ordered list of snapshots for one job
pub struct SnapshotBuilder<'a> {
    sources: &'a dyn SourceStore,
    provider: &'a dyn SyntaxTreeProvider,
    analyzer: &'a dyn UsageAnalyzer,
    config: &'a EngineConfig,
}

/// Sources read so far, keyed by resolved path
#[derive(Default)]
struct SourceCache {
    paths: BTreeMap<String, String>,
    contents: Snapshot,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(
        sources: &'a dyn SourceStore,
        provider: &'a dyn SyntaxTreeProvider,
        analyzer: &'a dyn UsageAnalyzer,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            sources,
            provider,
            analyzer,
            config,
        }
    }

    /// Build one snapshot per test in `order`, then the final one
    ///
    /// `progress` receives a description before each step.
    pub async fn build<F>(
        &self,
        pkg: &str,
        order: &[String],
        profiles: &TestProfiles,
        mut progress: F,
    ) -> Result<Vec<Snapshot>, JobError>
    where
        F: FnMut(String) + Send,
    {
        let mut accumulated: Vec<CoverageProfile> = Vec::new();
        let mut cache = SourceCache::default();
        let mut snapshots = Vec::with_capacity(order.len() + 1);

        for (idx, test) in order.iter().enumerate() {
            progress(format!("Constructing diff {} of {}", idx + 1, order.len()));

            let incoming = profiles
                .get(test)
                .ok_or_else(|| JobError::MissingProfile(test.clone()))?;
            let (merged, gain) = merge(&accumulated, incoming);
            accumulated = merged;
            info!("{} adds {} covered lines", test, gain);

            let snapshot = self.step(pkg, &accumulated, &mut cache).await?;
            debug!("snapshot {} holds {} files", idx + 1, snapshot.len());
            snapshots.push(snapshot);
        }

        progress("Loading final file contents".to_string());
        for profile in &accumulated {
            self.load(pkg, &profile.file, &mut cache).await?;
        }
        snapshots.push(cache.contents);

        Ok(snapshots)
    }

    async fn step(
        &self,
        pkg: &str,
        accumulated: &[CoverageProfile],
        cache: &mut SourceCache,
    ) -> Result<Snapshot, JobError> {
        let mut trees: Vec<SyntaxTree> = Vec::with_capacity(accumulated.len());

        for profile in accumulated {
            let (path, source) = self.load(pkg, &profile.file, cache).await?;
            let mut tree = self
                .provider
                .parse(&path, &source)
                .map_err(|cause| JobError::Parse {
                    file: path.clone(),
                    cause,
                })?;

            prune(&mut tree, profile);
            trees.push(tree);
        }

        let report = Eliminator::new(self.analyzer)
            .with_root_symbol(self.config.root_symbol.as_str())
            .with_max_passes(self.config.max_elimination_passes)
            .run(&mut trees);
        debug!(
            "elimination: {} passes, {} deletions, degraded={}",
            report.passes, report.deleted, report.degraded
        );

        let mut snapshot = Snapshot::new();
        for tree in &trees {
            let rendered = self
                .provider
                .render(tree)
                .map_err(|cause| JobError::Render {
                    file: tree.path().to_string(),
                    cause,
                })?;
            snapshot.insert(tree.path().to_string(), rendered);
        }

        Ok(snapshot)
    }

    /// Resolve and read a coverage file once per job
    async fn load(
        &self,
        pkg: &str,
        file: &str,
        cache: &mut SourceCache,
    ) -> Result<(String, Vec<u8>), JobError> {
        let path = match cache.paths.get(file) {
            Some(path) => path.clone(),
            None => {
                let path = self
                    .sources
                    .resolve(pkg, file)
                    .await
                    .map_err(|cause| JobError::Source {
                        file: file.to_string(),
                        cause,
                    })?;
                cache.paths.insert(file.to_string(), path.clone());
                path
            }
        };

        if let Some(source) = cache.contents.get(&path) {
            return Ok((path, source.clone()));
        }

        debug!("loading final contents for {}", path);
        let source = self
            .sources
            .read(&path)
            .await
            .map_err(|cause| JobError::Source {
                file: path.clone(),
                cause,
            })?;
        cache.contents.insert(path.clone(), source.clone());
        Ok((path, source))
    }
}
