//! Job orchestration
//!
//! [`CommitLog`] owns the collaborators, the coverage memo and the job
//! status table. Starting a job records it as initializing and spawns the
//! pipeline: coverage collection, ordering, then snapshot construction.
//! Progress and the final outcome are written to the job store, which is
//! where status reads are served from.

use crate::config::EngineConfig;
use crate::error::JobError;
use crate::pool::{CoverageCache, CoveragePool};
use crate::runner::{SourceStore, TestRunner};
use crate::snapshot::SnapshotBuilder;
use anyhow::Result;
use cl_core::{OrderKind, TestOrder};
use journal::{JobCacheEntry, JobResult, JobStore, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use syntax::{NameUsageAnalyzer, SyntaxTreeProvider, UsageAnalyzer};
use tracing::{info, warn};
use ulid::Ulid;

/// Parameters of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub pkg: String,
    pub tests: Vec<String>,
    pub order: OrderKind,
}

/// The commitlog application
#[derive(Clone)]
pub struct CommitLog {
    runner: Arc<dyn TestRunner>,
    sources: Arc<dyn SourceStore>,
    provider: Arc<dyn SyntaxTreeProvider>,
    analyzer: Arc<dyn UsageAnalyzer>,
    coverage: CoverageCache,
    jobs: JobStore,
    config: EngineConfig,
}

impl CommitLog {
    /// Create an app with fresh stores; must be called inside a tokio runtime
    pub fn new(
        runner: Arc<dyn TestRunner>,
        sources: Arc<dyn SourceStore>,
        provider: Arc<dyn SyntaxTreeProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            runner,
            sources,
            provider,
            analyzer: Arc::new(NameUsageAnalyzer),
            coverage: CoverageCache::new(),
            jobs: JobStore::new(),
            config,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn UsageAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Share a coverage memo with other app instances
    pub fn with_coverage_cache(mut self, coverage: CoverageCache) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn coverage_cache(&self) -> &CoverageCache {
        &self.coverage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a job in the background and return its id
    pub fn start_job(&self, job: JobConfig) -> Result<String, JobError> {
        let id = Ulid::new().to_string();
        self.jobs.begin(&id)?;
        info!(
            "Starting job {} for {} ({} tests, {} order)",
            id,
            job.pkg,
            job.tests.len(),
            job.order
        );

        let app = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move {
            let recorded = match app.run_job(&job_id, job).await {
                Ok(results) => app.jobs.complete(&job_id, results),
                Err(err) => app.jobs.fail(&job_id, &err),
            };
            if let Err(err) = recorded {
                warn!("Could not record outcome of job {}: {}", job_id, err);
            }
        });

        Ok(id)
    }

    /// Current status of a job; `None` for unknown ids
    pub async fn job_status(&self, id: &str) -> Result<Option<JobCacheEntry>, JobError> {
        Ok(self.jobs.status(id).await?)
    }

    /// Poll a job until it completes or fails
    pub async fn wait_for(&self, id: &str, interval: Duration) -> Result<JobCacheEntry, JobError> {
        loop {
            match self.job_status(id).await? {
                Some(entry) if entry.complete => return Ok(entry),
                Some(_) => tokio::time::sleep(interval).await,
                None => return Err(JobError::UnknownJob(id.to_string())),
            }
        }
    }

    /// Write a snapshot's files back through the source store
    pub async fn checkout(&self, files: &Snapshot) -> Result<()> {
        for (path, contents) in files {
            self.sources.write(path, contents).await?;
        }
        info!("Checked out {} files", files.len());
        Ok(())
    }

    async fn run_job(&self, id: &str, job: JobConfig) -> Result<JobResult, JobError> {
        let pool = CoveragePool::new(
            Arc::clone(&self.runner),
            self.coverage.clone(),
            self.config.max_workers,
        );

        let total = job.tests.len();
        self.jobs
            .progress(id, format!("Computing coverage for 0 of {} tests", total))?;

        let jobs = self.jobs.clone();
        let job_id = id.to_string();
        let profiles = pool
            .collect(&job.pkg, &job.tests, move |done, total| {
                report(
                    &jobs,
                    &job_id,
                    format!("Computing coverage for {} of {} tests", done, total),
                );
            })
            .await?;

        self.jobs.progress(id, "Computing test ordering")?;
        let order = TestOrder::from_kind(job.order, &job.tests).sort(&profiles);
        info!("Job {} test order: {:?}", id, order);

        let builder = SnapshotBuilder::new(
            self.sources.as_ref(),
            self.provider.as_ref(),
            self.analyzer.as_ref(),
            &self.config,
        );
        let files = builder
            .build(&job.pkg, &order, &profiles, |details| {
                report(&self.jobs, id, details)
            })
            .await?;

        Ok(JobResult {
            tests: order,
            files,
        })
    }
}

fn report(jobs: &JobStore, id: &str, details: String) {
    if let Err(err) = jobs.progress(id, details) {
        warn!("Dropped progress update for job {}: {}", id, err);
    }
}
