//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::cli::args::{OutputFormat, PostSearchArgs};
use crate::error::Result;
use crate::index::IndexStats;
use crate::service::SearchPage;
use crate::synchronizer::ReindexReport;

/// A command result that can also be shown as plain text.
pub trait HumanOutput {
    fn to_human(&self, args: &PostSearchArgs) -> String;
}

/// Print a result in the requested format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &PostSearchArgs) -> Result<()> {
    println!("{}", render(result, args)?);
    Ok(())
}

pub fn render<T: Serialize + HumanOutput>(result: &T, args: &PostSearchArgs) -> Result<String> {
    Ok(match args.output_format {
        OutputFormat::Human => result.to_human(args),
        OutputFormat::Json if args.pretty => serde_json::to_string_pretty(result)?,
        OutputFormat::Json => serde_json::to_string(result)?,
    })
}

/// Index statistics, with or without per-field term counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOutput {
    #[serde(flatten)]
    pub stats: IndexStats,
    #[serde(skip)]
    pub show_terms: bool,
}

impl HumanOutput for StatsOutput {
    fn to_human(&self, _args: &PostSearchArgs) -> String {
        let stats = &self.stats;
        let mut out = String::new();
        let path = stats
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string());

        let _ = writeln!(out, "Index:               {path}");
        let _ = writeln!(out, "Documents:           {}", stats.document_count);
        let _ = writeln!(out, "Deleted (pending):   {}", stats.deleted_pending);
        let _ = writeln!(out, "WAL records:         {}", stats.wal_pending_records);
        let _ = writeln!(out, "WAL size:            {} bytes", stats.wal_bytes);
        let _ = writeln!(out, "Schema version:      {}", stats.schema_version);
        let _ = write!(out, "Last checkpoint seq: {}", stats.last_checkpoint_seq);

        if self.show_terms {
            let _ = write!(out, "\nTerms per field:");
            for (field, count) in &stats.term_counts {
                let _ = write!(out, "\n  {field:<12} {count}");
            }
        }
        out
    }
}

impl HumanOutput for ReindexReport {
    fn to_human(&self, _args: &PostSearchArgs) -> String {
        format!(
            "Reindexed {} of {} records ({} skipped, {} failed); index holds {} documents",
            self.indexed, self.seen, self.skipped, self.failed, self.document_count
        )
    }
}

impl HumanOutput for SearchPage {
    fn to_human(&self, args: &PostSearchArgs) -> String {
        let mut out = String::new();
        let first = if self.results.is_empty() { 0 } else { self.offset + 1 };
        let _ = write!(
            out,
            "Showing {first}-{} of {} matches",
            self.offset + self.results.len(),
            self.total
        );

        for (i, post) in self.results.iter().enumerate() {
            let _ = write!(
                out,
                "\n\n{}. {} [{}]\n   id: {}  owner: {}  created: {}",
                self.offset + i + 1,
                post.title,
                post.category,
                post.post_id,
                post.user_id,
                post.created_at.to_rfc3339()
            );
            if args.verbosity() > 1 {
                if let Some(description) = &post.description {
                    let _ = write!(out, "\n   {description}");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::record::Post;

    fn args(extra: &[&str]) -> PostSearchArgs {
        let mut argv = vec!["postsearch"];
        argv.extend_from_slice(extra);
        argv.push("stats");
        PostSearchArgs::try_parse_from(argv).unwrap()
    }

    fn page() -> SearchPage {
        SearchPage {
            results: vec![Post::new("p1", "u1", "Rust tips", "dev")],
            total: 12,
            limit: 10,
            offset: 10,
        }
    }

    #[test]
    fn test_human_search_page() {
        let text = render(&page(), &args(&[])).unwrap();
        assert!(text.starts_with("Showing 11-11 of 12 matches"));
        assert!(text.contains("11. Rust tips [dev]"));
    }

    #[test]
    fn test_json_search_page() {
        let text = render(&page(), &args(&["--format", "json"])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total"], 12);
        assert_eq!(value["results"][0]["postId"], "p1");
    }

    #[test]
    fn test_reindex_report() {
        let report = ReindexReport {
            seen: 3,
            indexed: 2,
            skipped: 1,
            failed: 0,
            document_count: 2,
        };
        let text = render(&report, &args(&[])).unwrap();
        assert_eq!(
            text,
            "Reindexed 2 of 3 records (1 skipped, 0 failed); index holds 2 documents"
        );
    }
}
