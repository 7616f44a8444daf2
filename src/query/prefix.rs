//! Prefix query.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::{DocScores, Query};

/// Matches documents having any term in the field that starts with the
/// prefix. Every match scores the boost; an empty prefix matches nothing.
#[derive(Debug, Clone)]
pub struct PrefixQuery {
    field: String,
    prefix: String,
    boost: f32,
}

impl PrefixQuery {
    pub fn new<F: Into<String>, P: Into<String>>(field: F, prefix: P) -> Self {
        PrefixQuery {
            field: field.into(),
            prefix: prefix.into(),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Query for PrefixQuery {
    fn execute(&self, reader: &dyn IndexReader) -> Result<DocScores> {
        let mut scores = DocScores::new();
        if self.prefix.is_empty() {
            return Ok(scores);
        }

        for (_, postings) in reader.terms_with_prefix(&self.field, &self.prefix) {
            for posting in postings.iter().filter(|p| reader.is_live(p.doc)) {
                scores.insert(posting.doc, self.boost);
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
        format!("{}:{}*^{}", self.field, self.prefix, self.boost)
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
    use crate::schema::{FIELD_CATEGORY, FIELD_TITLE};

    #[test]
    fn test_prefix_query() {
        let index = index_of(&[
            ("p1", "Programming in Rust", "", "Programming"),
            ("p2", "Progressive web apps", "", "Web"),
            ("p3", "Cooking pasta", "", "Food"),
        ]);

        let scores = PrefixQuery::new(FIELD_TITLE, "prog")
            .with_boost(5.0)
            .execute(&index)
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&0], 5.0);
        assert_eq!(scores[&1], 5.0);

        let category = PrefixQuery::new(FIELD_CATEGORY, "prog").execute(&index).unwrap();
        assert_eq!(category.len(), 1);
        assert!(category.contains_key(&0));
    }

    #[test]
    fn test_empty_prefix_matches_nothing() {
        let index = index_of(&[("p1", "anything", "", "misc")]);
        assert!(PrefixQuery::new(FIELD_TITLE, "").execute(&index).unwrap().is_empty());
        assert_eq!(PrefixQuery::new(FIELD_TITLE, "an").prefix(), "an");
    }
}
