//! Commitlog CLI - commitlog command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

/// Commitlog - replay a package's history one test at a time
#[derive(Parser)]
#[command(name = "commitlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one snapshot per test and record them
    Run {
        /// Package the tests belong to
        #[arg(long)]
        pkg: String,
        /// Test to include (repeat for several)
        #[arg(long = "test", required = true)]
        tests: Vec<String>,
        /// Ordering: hardcoded, raw, net or importance
        #[arg(long, default_value = "hardcoded")]
        sort: String,
        /// Directory of recorded coverage (<dir>/<pkg>/<test>.json)
        #[arg(long, default_value = "profiles")]
        profiles: PathBuf,
        /// Directory sources are resolved against
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Concurrent coverage workers (overrides the config file)
        #[arg(long)]
        workers: Option<usize>,
        /// Engine configuration file
        #[arg(long, default_value = engine::CONFIG_FILE)]
        config: PathBuf,
        /// Where to write the job status record
        #[arg(long, default_value = "commitlog.json")]
        out: PathBuf,
    },
    /// Print a recorded snapshot
    Show {
        /// Job status record written by `run`
        results: PathBuf,
        /// Snapshot index (the last one holds the unmodified sources)
        #[arg(long, default_value = "0")]
        index: usize,
        /// Show the diff against the previous snapshot instead
        #[arg(long)]
        diff: bool,
        /// Number of context lines (default: 3)
        #[arg(short = 'U', long, default_value = "3")]
        context: usize,
    },
    /// Write a recorded snapshot back to disk
    Checkout {
        /// Job status record written by `run`
        results: PathBuf,
        /// Snapshot index (the last one holds the unmodified sources)
        #[arg(long)]
        index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            pkg,
            tests,
            sort,
            profiles,
            root,
            workers,
            config,
            out,
        } => {
            cmd::run::run(cmd::run::RunOptions {
                pkg,
                tests,
                sort,
                profiles,
                root,
                workers,
                config,
                out,
            })
            .await
        }
        Commands::Show {
            results,
            index,
            diff,
            context,
        } => cmd::show::run(&results, index, diff, context).await,
        Commands::Checkout { results, index } => cmd::checkout::run(&results, index).await,
    }
}
