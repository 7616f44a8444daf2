//! Free-text query compilation.
//!
//! A query string becomes one composite [`BooleanQuery`] that OR-combines
//! weighted sub-queries: a fuzzy term match and a prefix match for each of
//! the title, description, body and category fields, plus a wildcard
//! catch-all across all of them.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::analysis::analyzer::simple::SimpleAnalyzer;
use crate::error::{PostSearchError, Result};
use crate::query::{
    BooleanClause, BooleanQuery, DateRangeQuery, FuzzyQuery, PrefixQuery, Query, WildcardQuery,
};
use crate::schema::{FIELD_BODY, FIELD_CATEGORY, FIELD_DESCRIPTION, FIELD_TITLE, Schema};

/// Edit distance tolerated by the fuzzy sub-queries.
pub const FUZZY_MAX_EDITS: u32 = 1;

/// Boosts of the sub-queries. Only their order is fixed: each weight in
/// [`RankingWeights::ordered`] must be strictly greater than the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub title_fuzzy: f32,
    pub title_prefix: f32,
    pub category_fuzzy: f32,
    pub category_prefix: f32,
    pub wildcard: f32,
    pub description_fuzzy: f32,
    pub description_prefix: f32,
    pub body_fuzzy: f32,
    pub body_prefix: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        RankingWeights {
            title_fuzzy: 6.0,
            title_prefix: 5.0,
            category_fuzzy: 4.5,
            category_prefix: 4.0,
            wildcard: 3.5,
            description_fuzzy: 3.0,
            description_prefix: 2.5,
            body_fuzzy: 2.0,
            body_prefix: 1.5,
        }
    }
}

impl RankingWeights {
    /// Weights from highest to lowest precedence.
    pub fn ordered(&self) -> [(&'static str, f32); 9] {
        [
            ("title_fuzzy", self.title_fuzzy),
            ("title_prefix", self.title_prefix),
            ("category_fuzzy", self.category_fuzzy),
            ("category_prefix", self.category_prefix),
            ("wildcard", self.wildcard),
            ("description_fuzzy", self.description_fuzzy),
            ("description_prefix", self.description_prefix),
            ("body_fuzzy", self.body_fuzzy),
            ("body_prefix", self.body_prefix),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = self.ordered();

        for (name, weight) in ordered {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(PostSearchError::invalid_config(format!(
                    "ranking weight {name} must be positive and finite, got {weight}"
                )));
            }
        }

        for pair in ordered.windows(2) {
            let (higher, higher_weight) = pair[0];
            let (lower, lower_weight) = pair[1];
            if higher_weight <= lower_weight {
                return Err(PostSearchError::invalid_config(format!(
                    "ranking weight {higher} ({higher_weight}) must be greater than {lower} ({lower_weight})"
                )));
            }
        }

        Ok(())
    }
}

/// The outcome of compiling a query string.
#[derive(Debug, Clone)]
pub enum CompiledQuery {
    /// Nothing to search for; the result is empty with a zero total.
    Empty,
    Ranked(BooleanQuery),
}

impl CompiledQuery {
    pub fn is_empty(&self) -> bool {
        matches!(self, CompiledQuery::Empty)
    }
}

/// Builds ranked queries from free text.
#[derive(Debug)]
pub struct QueryCompiler {
    analyzer: PerFieldAnalyzer,
    prefix_analyzer: SimpleAnalyzer,
    weights: RankingWeights,
}

impl QueryCompiler {
    /// Fails if the weights violate the precedence order.
    pub fn new(schema: &Schema, weights: RankingWeights) -> Result<Self> {
        weights.validate()?;
        Ok(QueryCompiler {
            analyzer: schema.analyzer(),
            prefix_analyzer: SimpleAnalyzer::new(),
            weights,
        })
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    pub fn compile(&self, text: &str) -> Result<CompiledQuery> {
        self.compile_with_range(text, None, None)
    }

    /// Compile with an optional inclusive `createdAt` filter. The filter
    /// narrows the matches without changing their scores.
    pub fn compile_with_range(
        &self,
        text: &str,
        created_after: Option<DateTime<Utc>>,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<CompiledQuery> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(CompiledQuery::Empty);
        }

        let tokens = self.prefix_analyzer.terms(text)?;
        if tokens.is_empty() {
            // Punctuation only; nothing a word could match.
            return Ok(CompiledQuery::Empty);
        }
        let whole = text.to_lowercase();
        let w = self.weights;

        let mut query = BooleanQuery::new().with_minimum_should_match(1);
        let mut add = |sub: Option<Box<dyn Query>>| {
            if let Some(sub) = sub {
                query.add_clause(BooleanClause::should(sub));
            }
        };

        add(self.fuzzy_field(FIELD_TITLE, text, w.title_fuzzy)?);
        add(prefix_field(FIELD_TITLE, &tokens, w.title_prefix));
        add(self.fuzzy_field(FIELD_CATEGORY, text, w.category_fuzzy)?);
        add(prefix_field(FIELD_CATEGORY, std::slice::from_ref(&whole), w.category_prefix));
        add(wildcard_all(&tokens, w.wildcard)?);
        add(self.fuzzy_field(FIELD_DESCRIPTION, text, w.description_fuzzy)?);
        add(prefix_field(FIELD_DESCRIPTION, &tokens, w.description_prefix));
        add(self.fuzzy_field(FIELD_BODY, text, w.body_fuzzy)?);
        add(prefix_field(FIELD_BODY, &tokens, w.body_prefix));

        if created_after.is_some() || created_before.is_some() {
            let range = DateRangeQuery::new(created_after, created_before).with_boost(0.0);
            query.add_clause(BooleanClause::must(Box::new(range)));
        }

        debug!("Compiled '{text}' into {}", query.description());
        Ok(CompiledQuery::Ranked(query))
    }

    /// Fuzzy matches of every analyzed query term in one field.
    fn fuzzy_field(&self, field: &str, text: &str, weight: f32) -> Result<Option<Box<dyn Query>>> {
        let terms = self.analyzer.field_terms(field, text)?;
        let queries = terms.into_iter().map(|term| {
            Box::new(FuzzyQuery::new(field, term).max_edits(FUZZY_MAX_EDITS)) as Box<dyn Query>
        });
        Ok(any_of(queries, weight))
    }
}

fn prefix_field(field: &str, prefixes: &[String], weight: f32) -> Option<Box<dyn Query>> {
    let queries = prefixes
        .iter()
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| Box::new(PrefixQuery::new(field, prefix.clone())) as Box<dyn Query>);
    any_of(queries, weight)
}

fn wildcard_all(tokens: &[String], weight: f32) -> Result<Option<Box<dyn Query>>> {
    let fields: Vec<String> = [FIELD_TITLE, FIELD_DESCRIPTION, FIELD_BODY, FIELD_CATEGORY]
        .iter()
        .map(|field| field.to_string())
        .collect();

    let mut queries = Vec::with_capacity(tokens.len());
    for token in tokens {
        let pattern = format!("{}*", WildcardQuery::escape(token));
        queries.push(Box::new(WildcardQuery::new(fields.clone(), pattern)?) as Box<dyn Query>);
    }
    Ok(any_of(queries.into_iter(), weight))
}

/// OR-combine sub-queries under one weight.
fn any_of<I>(queries: I, weight: f32) -> Option<Box<dyn Query>>
where
    I: Iterator<Item = Box<dyn Query>>,
{
    let mut combined = BooleanQuery::new()
        .with_minimum_should_match(1)
        .with_boost(weight);
    for query in queries {
        combined.add_should(query);
    }

    if combined.is_empty() {
        None
    } else {
        Some(Box::new(combined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::term::test_support::index_of;

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(&Schema::posts(), RankingWeights::default()).unwrap()
    }

    fn ranked(compiled: CompiledQuery) -> BooleanQuery {
        match compiled {
            CompiledQuery::Ranked(query) => query,
            CompiledQuery::Empty => panic!("expected a ranked query"),
        }
    }

    #[test]
    fn test_default_weights_are_ordered() {
        RankingWeights::default().validate().unwrap();
    }

    #[test]
    fn test_misordered_weights_rejected() {
        let weights = RankingWeights {
            body_prefix: 10.0,
            ..RankingWeights::default()
        };
        assert!(matches!(
            QueryCompiler::new(&Schema::posts(), weights),
            Err(PostSearchError::InvalidConfig(_))
        ));

        let equal = RankingWeights {
            title_prefix: 6.0,
            ..RankingWeights::default()
        };
        assert!(equal.validate().is_err());

        let negative = RankingWeights {
            body_prefix: -1.0,
            ..RankingWeights::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_empty_input() {
        let compiler = compiler();
        assert!(compiler.compile("").unwrap().is_empty());
        assert!(compiler.compile("   \t ").unwrap().is_empty());
        assert!(compiler.compile("?!").unwrap().is_empty());
        assert!(compiler.compile("*").unwrap().is_empty());
    }

    #[test]
    fn test_query_shape() {
        let query = ranked(compiler().compile("Rust tips").unwrap());
        assert_eq!(query.minimum_should_match(), 1);
        assert_eq!(query.clauses().len(), 9);
        assert_eq!(query.clauses()[0].query.boost(), 6.0);
        assert_eq!(query.clauses()[8].query.boost(), 1.5);
    }

    #[test]
    fn test_title_ranks_above_body() {
        let index = index_of(&[
            ("body-only", "cooking", "notes about kubernetes clusters", "misc"),
            ("title-only", "kubernetes", "", "misc"),
        ]);

        let scores = ranked(compiler().compile("kubernetes").unwrap())
            .execute(&index)
            .unwrap();
        assert!(scores[&1] > scores[&0]);
    }

    #[test]
    fn test_date_filter() {
        use chrono::TimeZone;

        let index = index_of(&[("p1", "rust", "", "dev"), ("p2", "rust", "", "dev")]);
        let after = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let unfiltered = ranked(compiler().compile("rust").unwrap())
            .execute(&index)
            .unwrap();
        let filtered = ranked(compiler().compile_with_range("rust", Some(after), None).unwrap())
            .execute(&index)
            .unwrap();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[&1], unfiltered[&1]);
    }
}
