//! Engine configuration
//!
//! Read from an optional `commitlog.toml`; every key may be omitted.
//!
//! ```toml
//! max_workers = 4
//! root_symbol = "main"
//! max_elimination_passes = 10000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use syntax::{DEFAULT_MAX_PASSES, DEFAULT_ROOT_SYMBOL};

/// File name looked up in the working directory
pub const CONFIG_FILE: &str = "commitlog.toml";

/// Upper bound for concurrent coverage workers
pub const MAX_WORKERS_LIMIT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Concurrent coverage collections per job (1-64)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Declaration name the eliminator never removes
    #[serde(default = "default_root_symbol")]
    pub root_symbol: String,

    /// Safety ceiling on elimination passes per snapshot
    #[serde(default = "default_max_passes")]
    pub max_elimination_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            root_symbol: default_root_symbol(),
            max_elimination_passes: default_max_passes(),
        }
    }
}

fn default_max_workers() -> usize {
    4
}

fn default_root_symbol() -> String {
    DEFAULT_ROOT_SYMBOL.to_string()
}

fn default_max_passes() -> usize {
    DEFAULT_MAX_PASSES
}

impl EngineConfig {
    /// Load configuration from `path`, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WORKERS_LIMIT).contains(&self.max_workers) {
            anyhow::bail!(
                "max_workers must be between 1 and {} (got {})",
                MAX_WORKERS_LIMIT,
                self.max_workers
            );
        }

        if self.root_symbol.trim().is_empty() {
            anyhow::bail!("root_symbol must not be empty");
        }

        if self.max_elimination_passes == 0 {
            anyhow::bail!("max_elimination_passes must be at least 1");
        }

        Ok(())
    }
}
