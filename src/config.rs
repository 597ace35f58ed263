// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration.
//!
//! ## Sources (in precedence order)
//!
//! 1. Command-line flags
//! 2. `PULSE_CRAWL_DIR` / `PULSE_INDEX_DIR`
//! 3. The JSON file named by `--config` or `PULSE_CONFIG`
//! 4. Built-in defaults
//!
//! ```json
//! {
//!   "crawl_dir": "data/crawl",
//!   "index_dir": "data/index",
//!   "keep_snapshots": 3,
//!   "refresh": { "policy": "periodic", "interval_secs": 300, "max_retries": 3,
//!                "initial_backoff_ms": 150, "rebuild_timeout_secs": 600 },
//!   "search": { "default_limit": 10 }
//! }
//! ```
//!
//! Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};
use crate::index::RebuildOptions;
use crate::refresh::{RefreshPolicy, RetryPolicy};

pub const CONFIG_ENV: &str = "PULSE_CONFIG";
pub const CRAWL_DIR_ENV: &str = "PULSE_CRAWL_DIR";
pub const INDEX_DIR_ENV: &str = "PULSE_INDEX_DIR";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Crawl output directory read by `JsonlCrawlSource`.
    #[serde(default = "default_crawl_dir")]
    pub crawl_dir: PathBuf,

    /// Where index snapshots are written.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Snapshots kept after pruning.
    #[serde(default = "default_keep_snapshots")]
    pub keep_snapshots: usize,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    OnWrite,
    #[default]
    Periodic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default)]
    pub policy: PolicyKind,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// 0 disables the limit.
    #[serde(default = "default_rebuild_timeout_secs")]
    pub rebuild_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_crawl_dir() -> PathBuf {
    PathBuf::from("data/crawl")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("data/index")
}

fn default_keep_snapshots() -> usize {
    3
}

fn default_interval_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    150
}

fn default_max_backoff_ms() -> u64 {
    1200
}

fn default_rebuild_timeout_secs() -> u64 {
    600
}

fn default_limit() -> usize {
    10
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            crawl_dir: default_crawl_dir(),
            index_dir: default_index_dir(),
            keep_snapshots: default_keep_snapshots(),
            refresh: RefreshConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            interval_secs: default_interval_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            rebuild_timeout_secs: default_rebuild_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

impl PulseConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            PulseError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| PulseError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the file (explicit path, then `PULSE_CONFIG`, then defaults) and
    /// apply directory overrides from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(file) => Self::from_file(&file)?,
            None => Self::default(),
        };
        if let Some(dir) = std::env::var_os(CRAWL_DIR_ENV) {
            config.crawl_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(INDEX_DIR_ENV) {
            config.index_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh.policy == PolicyKind::Periodic && self.refresh.interval_secs == 0 {
            return Err(PulseError::Config(
                "refresh.interval_secs must be positive for the periodic policy".to_string(),
            ));
        }
        if self.search.default_limit == 0 {
            return Err(PulseError::Config(
                "search.default_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        match self.refresh.policy {
            PolicyKind::OnWrite => RefreshPolicy::OnWrite,
            PolicyKind::Periodic => RefreshPolicy::Periodic {
                interval: Duration::from_secs(self.refresh.interval_secs),
            },
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.refresh.max_retries,
            initial_backoff: Duration::from_millis(self.refresh.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.refresh.max_backoff_ms),
        }
    }

    pub fn rebuild_options(&self) -> RebuildOptions {
        RebuildOptions {
            timeout: (self.refresh.rebuild_timeout_secs > 0)
                .then(|| Duration::from_secs(self.refresh.rebuild_timeout_secs)),
        }
    }
}
