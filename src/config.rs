//! Search engine configuration.
//!
//! Every section has defaults, can be read from a JSON file, and the most
//! common settings can be overridden from `POSTSEARCH_*` environment
//! variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compiler::RankingWeights;
use crate::error::{PostSearchError, Result};
use crate::index::IndexConfig;

pub const ENV_INDEX_PATH: &str = "POSTSEARCH_INDEX_PATH";
pub const ENV_INDEX_WORKERS: &str = "POSTSEARCH_INDEX_WORKERS";
pub const ENV_QUEUE_CAPACITY: &str = "POSTSEARCH_QUEUE_CAPACITY";
pub const ENV_SEARCH_TIMEOUT_MS: &str = "POSTSEARCH_SEARCH_TIMEOUT_MS";

/// Page size rules of the search API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Background indexing settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Records per batch during a bulk reindex.
    pub reindex_batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(1, 4),
            queue_capacity: 1024,
            reindex_batch_size: 500,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Directory holding the indexes.
    pub index_root: PathBuf,
    /// Subdirectory of the posts index.
    pub index_name: String,
    pub pagination: PaginationConfig,
    pub indexing: IndexingConfig,
    pub index: IndexConfig,
    pub ranking: RankingWeights,
    /// Default deadline of one search, in milliseconds.
    pub search_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_root: PathBuf::from("./data/search"),
            index_name: "posts.idx".to_string(),
            pagination: PaginationConfig::default(),
            indexing: IndexingConfig::default(),
            index: IndexConfig::default(),
            ranking: RankingWeights::default(),
            search_timeout_ms: 2_000,
        }
    }
}

impl SearchConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `POSTSEARCH_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let config: SearchConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `POSTSEARCH_*` overrides on top of this configuration.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_INDEX_PATH).filter(|p| !p.trim().is_empty()) {
            self.index_root = PathBuf::from(path);
        }
        if let Some(workers) = lookup(ENV_INDEX_WORKERS) {
            self.indexing.workers = parse_number(ENV_INDEX_WORKERS, &workers)?;
        }
        if let Some(capacity) = lookup(ENV_QUEUE_CAPACITY) {
            self.indexing.queue_capacity = parse_number(ENV_QUEUE_CAPACITY, &capacity)?;
        }
        if let Some(timeout) = lookup(ENV_SEARCH_TIMEOUT_MS) {
            self.search_timeout_ms = parse_number(ENV_SEARCH_TIMEOUT_MS, &timeout)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.indexing.workers == 0 {
            return Err(PostSearchError::invalid_config("indexing.workers must be at least 1"));
        }
        if self.indexing.queue_capacity == 0 {
            return Err(PostSearchError::invalid_config(
                "indexing.queue_capacity must be at least 1",
            ));
        }
        if self.indexing.reindex_batch_size == 0 {
            return Err(PostSearchError::invalid_config(
                "indexing.reindex_batch_size must be at least 1",
            ));
        }
        if self.pagination.default_limit == 0 {
            return Err(PostSearchError::invalid_config(
                "pagination.default_limit must be at least 1",
            ));
        }
        if self.pagination.max_limit < self.pagination.default_limit {
            return Err(PostSearchError::invalid_config(format!(
                "pagination.max_limit ({}) is below pagination.default_limit ({})",
                self.pagination.max_limit, self.pagination.default_limit
            )));
        }
        if self.index.wal_checkpoint_ops == 0 {
            return Err(PostSearchError::invalid_config(
                "index.wal_checkpoint_ops must be at least 1",
            ));
        }
        self.ranking.validate()
    }

    /// Directory of the posts index.
    pub fn index_path(&self) -> PathBuf {
        self.index_root.join(&self.index_name)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        PostSearchError::invalid_config(format!("{key} must be a non-negative integer, got '{value}'"))
    })
}
