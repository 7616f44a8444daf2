//! Query types and execution.
//!
//! A query is evaluated against an [`IndexReader`] and yields a score for
//! every live document it matches. The composite ranked query built by the
//! compiler is a [`boolean::BooleanQuery`] over per-field sub-queries.

use std::fmt::Debug;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::reader::{DocOrd, IndexReader};

pub mod boolean;
pub mod collector;
pub mod fuzzy;
pub mod prefix;
pub mod range;
pub mod scorer;
pub mod term;
pub mod wildcard;

pub use boolean::{BooleanClause, BooleanQuery, Occur};
pub use collector::TopDocsCollector;
pub use fuzzy::FuzzyQuery;
pub use prefix::PrefixQuery;
pub use range::DateRangeQuery;
pub use term::TermQuery;
pub use wildcard::WildcardQuery;

/// Scores of the documents a query matched.
pub type DocScores = AHashMap<DocOrd, f32>;

/// Trait for search queries.
pub trait Query: Send + Sync + Debug {
    /// Score every live document this query matches.
    fn execute(&self, reader: &dyn IndexReader) -> Result<DocScores>;

    /// Get the boost factor for this query.
    fn boost(&self) -> f32;

    /// Set the boost factor for this query.
    fn set_boost(&mut self, boost: f32);

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Get the field name this query searches in, if applicable.
    fn field(&self) -> Option<&str> {
        None
    }
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// One ranked hit: a document identifier and its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// One page of ranked hits plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub total: u64,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Identifiers of the hits, in rank order.
    pub fn ids(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.id.clone()).collect()
    }
}
