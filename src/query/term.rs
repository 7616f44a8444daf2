//! Exact term query.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::scorer::BM25Scorer;
use crate::query::{DocScores, Query};

/// Matches documents containing an exact (already analyzed) term in a
/// field, scored with BM25.
#[derive(Debug, Clone)]
pub struct TermQuery {
    field: String,
    term: String,
    boost: f32,
}

impl TermQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

/// BM25 scores of every live document containing `term` in `field`.
pub(crate) fn score_term(
    reader: &dyn IndexReader,
    field: &str,
    term: &str,
    boost: f32,
) -> DocScores {
    score_term_with_freq(reader, field, term, reader.doc_freq(field, term), boost)
}

/// Like [`score_term`], with the IDF taken from `doc_freq` instead of the
/// term's own document frequency.
pub(crate) fn score_term_with_freq(
    reader: &dyn IndexReader,
    field: &str,
    term: &str,
    doc_freq: u64,
    boost: f32,
) -> DocScores {
    let mut scores = DocScores::new();
    let Some(postings) = reader.postings(field, term) else {
        return scores;
    };

    let scorer = BM25Scorer::new(
        doc_freq,
        reader.doc_count(),
        reader.field_stats(field).avg_length(),
        boost,
    );

    for posting in postings.iter().filter(|p| reader.is_live(p.doc)) {
        let field_length = reader.field_length(posting.doc, field);
        scores.insert(posting.doc, scorer.score(posting.freq, field_length));
    }

    scores
}

impl Query for TermQuery {
    fn execute(&self, reader: &dyn IndexReader) -> Result<DocScores> {
        Ok(score_term(reader, &self.field, &self.term, self.boost))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}:{}^{}", self.field, self.term, self.boost)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn field(&self) -> Option<&str> {
        Some(&self.field)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};

    use crate::document::IndexedDocument;
    use crate::index::inverted::{AnalyzedDocument, InvertedIndex};
    use crate::schema::Schema;

    /// Build an in-memory index from `(id, title, body, category)` rows.
    pub(crate) fn index_of(rows: &[(&str, &str, &str, &str)]) -> InvertedIndex {
        let schema = Schema::posts();
        let analyzer = schema.analyzer();
        let mut index = InvertedIndex::new();

        for (i, (id, title, body, category)) in rows.iter().enumerate() {
            let document = IndexedDocument {
                id: id.to_string(),
                title: title.to_string(),
                description: String::new(),
                body: body.to_string(),
                category: category.to_string(),
                owner_id: "u1".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::days(i as i64),
            };
            index.upsert(AnalyzedDocument::analyze(&schema, &analyzer, document).unwrap());
        }

        index
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::index_of;
    use super::*;
    use crate::schema::{FIELD_BODY, FIELD_TITLE};

    #[test]
    fn test_term_query() {
        let index = index_of(&[
            ("p1", "Rust tips", "", "dev"),
            ("p2", "Go tips", "rust mentioned here", "dev"),
            ("p3", "Cooking", "", "food"),
        ]);

        let scores = TermQuery::new(FIELD_TITLE, "rust").execute(&index).unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores[&0] > 0.0);

        let tips = TermQuery::new(FIELD_TITLE, "tip").execute(&index).unwrap();
        assert_eq!(tips.len(), 2);

        let body = TermQuery::new(FIELD_BODY, "rust").execute(&index).unwrap();
        assert!(body.contains_key(&1));
        assert!(TermQuery::new(FIELD_TITLE, "absent").execute(&index).unwrap().is_empty());
    }

    #[test]
    fn test_boost_and_description() {
        let index = index_of(&[("p1", "Rust", "", "dev"), ("p2", "Other", "", "dev")]);

        let plain = TermQuery::new(FIELD_TITLE, "rust").execute(&index).unwrap()[&0];
        let mut query = TermQuery::new(FIELD_TITLE, "rust");
        query.set_boost(2.0);
        let boosted = query.execute(&index).unwrap()[&0];

        assert!((boosted - 2.0 * plain).abs() < 1e-5);
        assert_eq!(query.description(), "title:rust^2");
        assert_eq!(query.field(), Some(FIELD_TITLE));
    }
}
