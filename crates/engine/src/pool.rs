//! Bounded coverage collection
//!
//! A job's tests go into a shared queue drained by at most `max_workers`
//! tasks. Each worker consults the coverage cache before calling the test
//! runner and writes fresh results back. The first worker error fails the
//! collection; the remaining workers are detached, finish the test they
//! hold and may still populate the cache.

use crate::error::JobError;
use crate::runner::TestRunner;
use cl_core::{CoverageProfile, TestProfiles};
use journal::Cache;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Memoized coverage, keyed by [`CoveragePool::cache_key`]
pub type CoverageCache = Cache<Vec<CoverageProfile>>;

/// Worker pool that collects per-test coverage
#[derive(Clone)]
pub struct CoveragePool {
    runner: Arc<dyn TestRunner>,
    cache: CoverageCache,
    max_workers: usize,
}

impl CoveragePool {
    pub fn new(runner: Arc<dyn TestRunner>, cache: CoverageCache, max_workers: usize) -> Self {
        Self {
            runner,
            cache,
            max_workers: max_workers.max(1),
        }
    }

    /// Cache key of one test's coverage
    ///
    /// NUL separates the parts since neither a package path nor a test name
    /// can contain it.
    pub fn cache_key(pkg: &str, test: &str) -> String {
        format!("{}\0{}", pkg, test)
    }

    /// Number of workers spawned for `tests` tests
    pub fn pool_size(&self, tests: usize) -> usize {
        self.max_workers.min(tests)
    }

    /// Collect coverage for every test of `pkg`
    ///
    /// `progress` is called with `(done, total)` after each test.
    pub async fn collect<F>(
        &self,
        pkg: &str,
        tests: &[String],
        progress: F,
    ) -> Result<TestProfiles, JobError>
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        let total = tests.len();
        let queue: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(tests.iter().cloned().collect()));
        let done = Arc::new(AtomicUsize::new(0));
        let progress = Arc::new(progress);

        let size = self.pool_size(total);
        info!("Collecting coverage for {} tests with {} workers", total, size);

        let mut workers = JoinSet::new();
        for worker in 0..size {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            let progress = Arc::clone(&progress);
            let runner = Arc::clone(&self.runner);
            let cache = self.cache.clone();
            let pkg = pkg.to_string();

            workers.spawn(async move {
                let mut collected = Vec::new();
                loop {
                    let next = queue.lock().pop_front();
                    let Some(test) = next else {
                        break;
                    };

                    let profiles = fetch(runner.as_ref(), &cache, &pkg, &test).await?;
                    let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(finished, total);
                    collected.push((test, profiles));
                }
                debug!("coverage worker {} drained the queue", worker);
                Ok::<_, JobError>(collected)
            });
        }

        let mut profiles = TestProfiles::new();
        while let Some(joined) = workers.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => Err(JobError::Worker(err.to_string())),
            };

            match outcome {
                Ok(collected) => profiles.extend(collected),
                Err(err) => {
                    queue.lock().clear();
                    workers.detach_all();
                    return Err(err);
                }
            }
        }

        Ok(profiles)
    }
}

async fn fetch(
    runner: &dyn TestRunner,
    cache: &CoverageCache,
    pkg: &str,
    test: &str,
) -> Result<Vec<CoverageProfile>, JobError> {
    let key = CoveragePool::cache_key(pkg, test);
    if let Some(profiles) = cache.read(&key).await? {
        debug!("coverage cache hit for {}", key);
        return Ok(profiles);
    }

    debug!("coverage cache miss for {}, running test", key);
    let profiles = runner
        .coverage(pkg, test)
        .await
        .map_err(|cause| JobError::Coverage {
            test: test.to_string(),
            cause,
        })?;

    cache.write(key, profiles.clone())?;
    Ok(profiles)
}
