//! Boolean query combining sub-queries.

use ahash::AHashMap;

use crate::error::Result;
use crate::index::reader::{DocOrd, IndexReader};
use crate::query::{DocScores, Query};

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
}

/// A clause in a boolean query.
#[derive(Debug)]
pub struct BooleanClause {
    pub query: Box<dyn Query>,
    pub occur: Occur,
}

impl Clone for BooleanClause {
    fn clone(&self) -> Self {
        BooleanClause {
            query: self.query.clone_box(),
            occur: self.occur,
        }
    }
}

impl BooleanClause {
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    pub fn must(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    pub fn should(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }
}

/// A query combining clauses with boolean logic.
///
/// A document's score is the sum of the scores of the clauses it matched,
/// times the boost. Without any `Must` clause at least one `Should` clause
/// has to match, whatever the configured minimum.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    boost: f32,
    minimum_should_match: usize,
}

#[derive(Default)]
struct Accumulated {
    score: f32,
    must: usize,
    should: usize,
}

impl BooleanQuery {
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
            minimum_should_match: 0,
        }
    }

    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    pub fn add_must(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must(query));
    }

    pub fn add_should(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::should(query));
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Set the minimum number of should clauses that must match.
    pub fn with_minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = minimum;
        self
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn minimum_should_match(&self) -> usize {
        self.minimum_should_match
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Get clauses by occurrence type.
    pub fn clauses_by_occur(&self, occur: Occur) -> Vec<&BooleanClause> {
        self.clauses.iter().filter(|c| c.occur == occur).collect()
    }
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for BooleanQuery {
    fn execute(&self, reader: &dyn IndexReader) -> Result<DocScores> {
        let must_count = self.clauses_by_occur(Occur::Must).len();
        let should_count = self.clauses_by_occur(Occur::Should).len();
        if must_count == 0 && should_count == 0 {
            return Ok(DocScores::new());
        }

        let required_should = if must_count == 0 {
            self.minimum_should_match.max(1)
        } else {
            self.minimum_should_match
        };
        if required_should > should_count {
            return Ok(DocScores::new());
        }

        let mut matched: AHashMap<DocOrd, Accumulated> = AHashMap::new();

        for clause in &self.clauses {
            let scores = clause.query.execute(reader)?;
            match clause.occur {
                Occur::Must => {
                    for (doc, score) in scores {
                        let entry = matched.entry(doc).or_default();
                        entry.score += score;
                        entry.must += 1;
                    }
                }
                Occur::Should => {
                    for (doc, score) in scores {
                        let entry = matched.entry(doc).or_default();
                        entry.score += score;
                        entry.should += 1;
                    }
                }
            }
        }

        Ok(matched
            .into_iter()
            .filter(|(_, acc)| acc.must == must_count && acc.should >= required_should)
            .map(|(doc, acc)| (doc, acc.score * self.boost))
            .collect())
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                let marker = match clause.occur {
                    Occur::Must => "+",
                    Occur::Should => "",
                };
                format!("{marker}{}", clause.query.description())
            })
            .collect();
        format!("({})^{}", clauses.join(" "), self.boost)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
