//! Print a recorded snapshot

use anyhow::Result;
use cli_lib::diff_utils;
use cli_lib::results;
use journal::Snapshot;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(results_path: &Path, index: usize, show_diff: bool, context: usize) -> Result<()> {
    let results = results::load(results_path)?;
    let snapshot = results::snapshot(&results, index)?;

    println!(
        "{} {} ({})",
        "snapshot".yellow().bold(),
        index.to_string().cyan(),
        results::label(&results, index).dimmed()
    );

    if show_diff {
        let empty = Snapshot::new();
        let previous = match index.checked_sub(1) {
            Some(prev) => results::snapshot(&results, prev)?,
            None => &empty,
        };

        let diff = diff_utils::diff_snapshots(previous, snapshot, context);
        if diff.is_empty() {
            println!("{}", "(no changes)".dimmed());
        } else {
            print!("{}", diff);
        }
        return Ok(());
    }

    for (path, contents) in snapshot {
        println!("\n{}", path.bold());
        if diff_utils::is_binary(contents) {
            println!("{}", "(binary content)".dimmed());
        } else {
            print!("{}", String::from_utf8_lossy(contents));
        }
    }

    Ok(())
}
