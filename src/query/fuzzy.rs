//! Fuzzy term query based on Levenshtein distance.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::scorer::bounded_relevance;
use crate::query::term::score_term_with_freq;
use crate::query::{DocScores, Query};
use crate::util::levenshtein::LevenshteinMatcher;

/// Most index terms one fuzzy query expands to.
pub const MAX_EXPANSIONS: usize = 50;

/// Matches terms within `max_edits` edits of the query term.
///
/// Every expansion is scored with BM25 against the highest document
/// frequency of the expansion set, so a rare misspelling gets no IDF edge
/// over a common exact term. The score is folded into a narrow band below
/// the boost by [`bounded_relevance`] and scaled by a similarity of
/// `1.0 - 0.2 * edits`; the exact term therefore always outranks a
/// misspelling. A document matching several expansions keeps its best one.
#[derive(Debug, Clone)]
pub struct FuzzyQuery {
    field: String,
    term: String,
    max_edits: u32,
    boost: f32,
}

/// A term of the index that matched the fuzzy term.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyExpansion {
    pub term: String,
    pub edits: u32,
    pub similarity: f32,
}

impl FuzzyQuery {
    /// Create a fuzzy query tolerating up to two edits.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        FuzzyQuery {
            field: field.into(),
            term: term.into(),
            max_edits: 2,
            boost: 1.0,
        }
    }

    /// Set the maximum edit distance (clamped to 2).
    pub fn max_edits(mut self, max_edits: u32) -> Self {
        self.max_edits = max_edits.min(2);
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn get_max_edits(&self) -> u32 {
        self.max_edits
    }

    /// Similarity weight for a given edit distance.
    pub fn similarity(edits: u32) -> f32 {
        (1.0 - 0.2 * edits as f32).max(0.0)
    }

    /// Index terms this query expands to, closest first.
    pub fn expansions(&self, reader: &dyn IndexReader) -> Vec<FuzzyExpansion> {
        let matcher = LevenshteinMatcher::new(self.term.as_str());
        let max_edits = self.max_edits as usize;

        let mut matches: Vec<(usize, &str)> = reader
            .terms_with_prefix(&self.field, "")
            .filter(|(_, postings)| postings.iter().any(|p| reader.is_live(p.doc)))
            .filter_map(|(candidate, _)| {
                let len = candidate.chars().count();
                if len.abs_diff(matcher.char_len()) > max_edits {
                    return None;
                }
                matcher
                    .distance_threshold(candidate, max_edits)
                    .map(|distance| (distance, candidate))
            })
            .collect();

        matches.sort();
        matches.truncate(MAX_EXPANSIONS);

        matches
            .into_iter()
            .map(|(distance, term)| {
                let edits = distance as u32;
                FuzzyExpansion {
                    term: term.to_string(),
                    edits,
                    similarity: Self::similarity(edits),
                }
            })
            .collect()
    }
}

impl Query for FuzzyQuery {
    fn execute(&self, reader: &dyn IndexReader) -> Result<DocScores> {
        let mut scores = DocScores::new();
        let expansions = self.expansions(reader);
        let blended_freq = expansions
            .iter()
            .map(|expansion| reader.doc_freq(&self.field, &expansion.term))
            .max()
            .unwrap_or(0);

        for expansion in expansions {
            let raw = score_term_with_freq(reader, &self.field, &expansion.term, blended_freq, 1.0);
            for (doc, bm25) in raw {
                let score = self.boost * expansion.similarity * bounded_relevance(bm25);
                let best = scores.entry(doc).or_insert(score);
                if score > *best {
                    *best = score;
                }
            }
        }

        Ok(scores)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}:{}~{}^{}", self.field, self.term, self.max_edits, self.boost)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn field(&self) -> Option<&str> {
        Some(&self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::term::test_support::index_of;
    use crate::schema::FIELD_TITLE;

    #[test]
    fn test_fuzzy_expansions() {
        let index = index_of(&[
            ("p1", "rust", "", "dev"),
            ("p2", "rest", "", "dev"),
            ("p3", "crust", "", "dev"),
            ("p4", "trusty", "", "dev"),
        ]);

        let query = FuzzyQuery::new(FIELD_TITLE, "rust").max_edits(1);
        let expansions = query.expansions(&index);
        let terms: Vec<&str> = expansions.iter().map(|e| e.term.as_str()).collect();

        assert_eq!(terms, vec!["rust", "crust", "rest"]);
        assert_eq!(expansions[0].similarity, 1.0);
        assert!((expansions[1].similarity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_exact_outranks_misspelling() {
        let index = index_of(&[("p1", "rust", "", "dev"), ("p2", "rest", "", "dev")]);

        let scores = FuzzyQuery::new(FIELD_TITLE, "rust")
            .max_edits(1)
            .execute(&index)
            .unwrap();

        assert_eq!(scores.len(), 2);
        assert!(scores[&0] > scores[&1]);
    }

    #[test]
    fn test_misspelled_query_matches() {
        let index = index_of(&[("p1", "kubernetes", "", "ops")]);

        let scores = FuzzyQuery::new(FIELD_TITLE, "kubernets")
            .max_edits(1)
            .execute(&index)
            .unwrap();
        assert!(scores.contains_key(&0));

        let none = FuzzyQuery::new(FIELD_TITLE, "kubrnets")
            .max_edits(1)
            .execute(&index)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_common_exact_term_outranks_rare_misspelling() {
        let mut titles: Vec<(String, &str)> = (0..40).map(|i| (format!("e{i}"), "rust")).collect();
        titles.push(("typo".to_string(), "rest"));
        let rows: Vec<(&str, &str, &str, &str)> = titles
            .iter()
            .map(|(id, title)| (id.as_str(), *title, "", "dev"))
            .collect();
        let index = index_of(&rows);

        let scores = FuzzyQuery::new(FIELD_TITLE, "rust")
            .max_edits(1)
            .with_boost(6.0)
            .execute(&index)
            .unwrap();

        assert_eq!(scores.len(), 41);
        let typo = scores[&40];
        assert!(typo <= 6.0 * 0.8);
        assert!((0..40).all(|doc| scores[&doc] > typo));
        assert!(scores.values().all(|&score| score <= 6.0));
    }

    #[test]
    fn test_max_edits_and_description() {
        let query = FuzzyQuery::new(FIELD_TITLE, "rust").max_edits(1);
        assert_eq!(query.description(), "title:rust~1^1");
        assert_eq!(query.term(), "rust");
        assert_eq!(FuzzyQuery::new(FIELD_TITLE, "x").max_edits(5).get_max_edits(), 2);
    }
}
