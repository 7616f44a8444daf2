//! Command implementations for the postsearch CLI.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::SearchConfig;
use crate::error::{PostSearchError, Result};
use crate::index::IndexHandle;
use crate::primary::PrimaryStore;
use crate::primary::jsonl::JsonlPrimaryStore;
use crate::service::{SearchRequest, SearchService};
use crate::synchronizer::reindex_all;

/// Execute a CLI command.
pub fn execute_command(args: PostSearchArgs) -> Result<()> {
    let config = load_config(&args)?;

    match &args.command {
        Command::Stats(stats_args) => show_stats(stats_args, &config, &args),
        Command::Reindex(reindex_args) => reindex(reindex_args, &config, &args),
        Command::Search(search_args) => search(search_args, &config, &args),
    }
}

/// Process exit status for a failed command: `75` (EX_TEMPFAIL) when
/// running it again may succeed once the cause is addressed, `1` otherwise.
pub fn exit_code(err: &PostSearchError) -> i32 {
    if err.is_retryable() { 75 } else { 1 }
}

/// Defaults, then the config file, then `POSTSEARCH_*` variables, then
/// `--index-path`.
pub fn load_config(args: &PostSearchArgs) -> Result<SearchConfig> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    if let Some(index_path) = &args.index_path {
        config.index_root = index_path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_index(config: &SearchConfig) -> Result<IndexHandle> {
    let path = config.index_path();
    info!("Opening index at {}", path.display());
    IndexHandle::open_with_config(path, &config.index)
}

fn show_stats(stats_args: &StatsArgs, config: &SearchConfig, args: &PostSearchArgs) -> Result<()> {
    let index = open_index(config)?;
    let stats = index.stats()?;
    index.close()?;

    output_result(
        &StatsOutput {
            stats,
            show_terms: stats_args.terms,
        },
        args,
    )
}

fn reindex(reindex_args: &ReindexArgs, config: &SearchConfig, args: &PostSearchArgs) -> Result<()> {
    let primary = JsonlPrimaryStore::load(&reindex_args.records)?;
    let batch_size = reindex_args
        .batch_size
        .unwrap_or(config.indexing.reindex_batch_size);

    let index = open_index(config)?;
    let report = reindex_all(&index, &primary, batch_size);
    // Close even when the reindex failed, so completed batches are
    // checkpointed.
    let closed = index.close();
    let report = report?;
    closed?;

    output_result(&report, args)
}

fn search(search_args: &SearchArgs, config: &SearchConfig, args: &PostSearchArgs) -> Result<()> {
    let primary: Arc<dyn PrimaryStore> = Arc::new(JsonlPrimaryStore::load(&search_args.records)?);
    let index = open_index(config)?;
    let service = SearchService::new(index.clone(), primary, config)?;

    let mut request = SearchRequest::new(search_args.query.clone());
    request.limit = search_args.limit;
    request.offset = search_args.offset;
    request.created_after = search_args.since;
    request.created_before = search_args.until;
    request.timeout = search_args.timeout_ms.map(Duration::from_millis);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let page = runtime.block_on(service.execute_async(request));
    let closed = index.close();
    let page = page?;
    closed?;

    output_result(&page, args)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_index_path_overrides_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        let args = PostSearchArgs::try_parse_from([
            "postsearch",
            "--index-path",
            root.to_str().unwrap(),
            "stats",
        ])
        .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.index_path(), root.join("posts.idx"));
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&PostSearchError::storage("disk full")), 75);
        assert_eq!(exit_code(&PostSearchError::QueueFull(8)), 75);
        assert_eq!(exit_code(&PostSearchError::invalid_config("workers = 0")), 1);
        assert_eq!(exit_code(&PostSearchError::query("bad pattern")), 1);
    }

    #[test]
    fn test_stats_creates_missing_index() {
        let dir = TempDir::new().unwrap();
        let args = PostSearchArgs::try_parse_from([
            "postsearch",
            "--quiet",
            "--format",
            "json",
            "--index-path",
            dir.path().to_str().unwrap(),
            "stats",
        ])
        .unwrap();

        execute_command(args).unwrap();
        assert!(dir.path().join("posts.idx").join("manifest.json").exists());
    }
}
