//! Job status records on disk

use anyhow::{Context, Result};
use journal::{JobCacheEntry, JobResult, Snapshot};
use std::path::Path;

/// Write a job's status record as pretty JSON
pub fn save(path: &Path, entry: &JobCacheEntry) -> Result<()> {
    let json = serde_json::to_string_pretty(entry).context("Failed to serialize job status")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write results to {}", path.display()))
}

/// Load the results of a successful job
pub fn load(path: &Path) -> Result<JobResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results from {}", path.display()))?;
    let entry: JobCacheEntry = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse results in {}", path.display()))?;

    if let Some(error) = entry.error {
        anyhow::bail!("Job recorded in {} failed: {}", path.display(), error);
    }
    if !entry.complete {
        anyhow::bail!("Job recorded in {} never completed", path.display());
    }

    entry
        .results
        .with_context(|| format!("No snapshots recorded in {}", path.display()))
}

/// Snapshot at `index`, with a readable error when out of range
pub fn snapshot(results: &JobResult, index: usize) -> Result<&Snapshot> {
    results.files.get(index).with_context(|| {
        format!(
            "Snapshot {} out of range (results hold {} snapshots)",
            index,
            results.files.len()
        )
    })
}

/// Describe what a snapshot index stands for
pub fn label(results: &JobResult, index: usize) -> String {
    match results.tests.get(index) {
        Some(test) => format!("after {}", test),
        None => "unmodified sources".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> JobResult {
        let mut first = Snapshot::new();
        first.insert("a.go".into(), b"package a\n".to_vec());
        JobResult {
            tests: vec!["TestA".into()],
            files: vec![first.clone(), first],
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");

        save(&path, &JobCacheEntry::succeeded(sample())).unwrap();

        let results = load(&path).unwrap();
        assert_eq!(results, sample());
        assert_eq!(label(&results, 0), "after TestA");
        assert_eq!(label(&results, 1), "unmodified sources");
        assert!(snapshot(&results, 2).is_err());
    }

    #[test]
    fn test_failed_job_has_no_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");

        save(&path, &JobCacheEntry::failed("runner exploded")).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("runner exploded"));
    }
}
