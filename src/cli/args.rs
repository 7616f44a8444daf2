//! Command line argument parsing using clap.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::ENV_INDEX_PATH;

/// postsearch - search index tooling for the posting backend
#[derive(Parser, Debug, Clone)]
#[command(name = "postsearch")]
#[command(about = "Inspect, rebuild and query the posts search index")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PostSearchArgs {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Directory holding the indexes (the posts index lives in posts.idx)
    #[arg(long, env = ENV_INDEX_PATH, global = true)]
    pub index_path: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl PostSearchArgs {
    /// Effective verbosity: 0 quiet, 1 normal, 2 info, 3 debug, 4+ trace.
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.saturating_add(1)
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show index statistics
    Stats(StatsArgs),

    /// Rebuild the index from a JSONL export of the primary store
    Reindex(ReindexArgs),

    /// Run a ranked search and hydrate the hits from a JSONL export
    Search(SearchArgs),
}

/// Arguments for index statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Include per-field term counts
    #[arg(long)]
    pub terms: bool,
}

/// Arguments for a bulk reindex
#[derive(Parser, Debug, Clone)]
pub struct ReindexArgs {
    /// JSONL file with one post per line
    #[arg(short, long, value_name = "JSONL")]
    pub records: PathBuf,

    /// Records per batch (defaults to the configured batch size)
    #[arg(short, long)]
    pub batch_size: Option<usize>,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// JSONL file with one post per line, used to hydrate hits
    #[arg(short, long, value_name = "JSONL")]
    pub records: PathBuf,

    /// Page size (non-positive values use the default)
    #[arg(short, long, allow_hyphen_values = true)]
    pub limit: Option<i64>,

    /// Hits to skip (negative values count as 0)
    #[arg(short, long, allow_hyphen_values = true)]
    pub offset: Option<i64>,

    /// Search deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Only posts created at or after this RFC 3339 time
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Only posts created at or before this RFC 3339 time
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,
}

/// Output formats available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// JSON
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args = PostSearchArgs::try_parse_from([
            "postsearch",
            "search",
            "rust tips",
            "--records",
            "posts.jsonl",
            "--limit",
            "-1",
            "--offset",
            "20",
            "--since",
            "2024-01-01T00:00:00Z",
        ])
        .unwrap();

        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.query, "rust tips");
            assert_eq!(search_args.records, PathBuf::from("posts.jsonl"));
            assert_eq!(search_args.limit, Some(-1));
            assert_eq!(search_args.offset, Some(20));
            assert!(search_args.since.is_some());
            assert!(search_args.until.is_none());
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_reindex_command() {
        let args = PostSearchArgs::try_parse_from([
            "postsearch",
            "--index-path",
            "/srv/search",
            "reindex",
            "--records",
            "export.jsonl",
            "--batch-size",
            "250",
        ])
        .unwrap();

        assert_eq!(args.index_path, Some(PathBuf::from("/srv/search")));
        if let Command::Reindex(reindex_args) = args.command {
            assert_eq!(reindex_args.batch_size, Some(250));
        } else {
            panic!("Expected Reindex command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = PostSearchArgs::try_parse_from(["postsearch", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = PostSearchArgs::try_parse_from(["postsearch", "-vv", "stats"]).unwrap();
        assert_eq!(args.verbosity(), 3);

        let args = PostSearchArgs::try_parse_from(["postsearch", "stats", "--quiet"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            PostSearchArgs::try_parse_from(["postsearch", "--format", "json", "stats"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
