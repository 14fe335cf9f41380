//! Run a job and record its snapshots

use anyhow::{Context, Result};
use cli_lib::{results, RecordedRunner};
use cl_core::OrderKind;
use engine::{CommitLog, EngineConfig, FsSourceStore, JobConfig};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use syntax::OutlineProvider;

/// Options of `commitlog run`
pub struct RunOptions {
    pub pkg: String,
    pub tests: Vec<String>,
    pub sort: String,
    pub profiles: PathBuf,
    pub root: PathBuf,
    pub workers: Option<usize>,
    pub config: PathBuf,
    pub out: PathBuf,
}

pub async fn run(opts: RunOptions) -> Result<()> {
    let mut config = EngineConfig::load(&opts.config)?;
    if let Some(workers) = opts.workers {
        config.max_workers = workers;
        config.validate().context("Invalid --workers value")?;
    }
    let order: OrderKind = opts.sort.parse()?;

    let app = CommitLog::new(
        Arc::new(RecordedRunner::new(&opts.profiles)),
        Arc::new(FsSourceStore::new(&opts.root)),
        Arc::new(OutlineProvider::new()),
        config,
    );

    let id = app.start_job(JobConfig {
        pkg: opts.pkg.clone(),
        tests: opts.tests.clone(),
        order,
    })?;
    println!("{} {} ({} order)", "Started job".bold(), id.cyan(), order);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let entry = loop {
        let entry = app
            .job_status(&id)
            .await?
            .with_context(|| format!("Job {} vanished from the status table", id))?;
        if entry.complete {
            break entry;
        }
        spinner.set_message(entry.details.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
    };
    spinner.finish_and_clear();

    results::save(&opts.out, &entry)?;

    if let Some(error) = &entry.error {
        anyhow::bail!("Job {} failed: {}", id, error);
    }
    let results = entry
        .results
        .with_context(|| format!("Job {} finished without results", id))?;

    println!("{}", "Test order:".bold());
    for (idx, test) in results.tests.iter().enumerate() {
        println!("  {} {}", format!("{:>3}", idx).dimmed(), test.yellow());
    }
    println!(
        "\n{} snapshots written to {}",
        results.files.len(),
        opts.out.display().to_string().cyan()
    );

    Ok(())
}
