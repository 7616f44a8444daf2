//! Wildcard query over one or more fields.

use regex::Regex;

use crate::error::{PostSearchError, Result};
use crate::index::reader::IndexReader;
use crate::query::{DocScores, Query};

/// Matches terms against a pattern where `*` is any sequence, `?` is any
/// single character and `\` escapes the next character.
///
/// A document matching in any of the fields scores the boost once.
#[derive(Debug, Clone)]
pub struct WildcardQuery {
    fields: Vec<String>,
    pattern: String,
    regex: Regex,
    literal_prefix: String,
    boost: f32,
}

impl WildcardQuery {
    /// Create a wildcard query. Fails if the pattern cannot be compiled.
    pub fn new<P: Into<String>>(fields: Vec<String>, pattern: P) -> Result<Self> {
        let pattern = pattern.into();
        let regex = Self::compile_pattern(&pattern)?;
        let literal_prefix = Self::literal_prefix(&pattern);

        Ok(WildcardQuery {
            fields,
            pattern,
            regex,
            literal_prefix,
            boost: 1.0,
        })
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Escape wildcard syntax so the text matches literally.
    pub fn escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(c, '*' | '?' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    fn compile_pattern(pattern: &str) -> Result<Regex> {
        let mut regex_pattern = String::from("^");
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => regex_pattern.push_str(&regex::escape(&escaped.to_string())),
                    None => regex_pattern.push_str("\\\\"),
                },
                '*' => regex_pattern.push_str(".*"),
                '?' => regex_pattern.push('.'),
                other => regex_pattern.push_str(&regex::escape(&other.to_string())),
            }
        }
        regex_pattern.push('$');

        Regex::new(&regex_pattern).map_err(|e| {
            PostSearchError::query(format!("invalid wildcard pattern '{pattern}': {e}"))
        })
    }

    /// Literal characters before the first unescaped wildcard.
    fn literal_prefix(pattern: &str) -> String {
        let mut prefix = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            match c {
                '*' | '?' => break,
                '\\' => match chars.next() {
                    Some(escaped) => prefix.push(escaped),
                    None => prefix.push('\\'),
                },
                other => prefix.push(other),
            }
        }
        prefix
    }
}

impl Query for WildcardQuery {
    fn execute(&self, reader: &dyn IndexReader) -> Result<DocScores> {
        let mut scores = DocScores::new();

        for field in &self.fields {
            let terms = reader
                .terms_with_prefix(field, &self.literal_prefix)
                .filter(|(term, _)| self.regex.is_match(term));

            for (_, postings) in terms {
                for posting in postings.iter().filter(|p| reader.is_live(p.doc)) {
                    scores.insert(posting.doc, self.boost);
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
        format!("[{}]:{}^{}", self.fields.join(","), self.pattern, self.boost)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
