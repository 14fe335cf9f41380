//! Write a recorded snapshot back to disk

use anyhow::Result;
use cli_lib::results;
use engine::{FsSourceStore, SourceStore};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(results_path: &Path, index: usize) -> Result<()> {
    let results = results::load(results_path)?;
    let snapshot = results::snapshot(&results, index)?;

    // Snapshot paths are already resolved, so the store root is unused
    let store = FsSourceStore::new(".");
    for (path, contents) in snapshot {
        store.write(path, contents).await?;
        println!("  {} {}", "wrote".green(), path);
    }

    println!(
        "Checked out snapshot {} ({})",
        index.to_string().cyan(),
        results::label(&results, index)
    );
    Ok(())
}
