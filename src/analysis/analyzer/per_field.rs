//! Per-field analyzer.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Applies a different analyzer to each field, falling back to a default
/// analyzer for fields that are not configured.
///
/// Reuse one analyzer instance across fields with `Arc::clone`.
#[derive(Clone)]
pub struct PerFieldAnalyzer {
    default_analyzer: Arc<dyn Analyzer>,
    field_analyzers: AHashMap<String, Arc<dyn Analyzer>>,
}

impl PerFieldAnalyzer {
    /// Create a new per-field analyzer with a default analyzer.
    pub fn new(default_analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            default_analyzer,
            field_analyzers: AHashMap::new(),
        }
    }

    /// Add a field-specific analyzer.
    pub fn add_analyzer(&mut self, field: impl Into<String>, analyzer: Arc<dyn Analyzer>) {
        self.field_analyzers.insert(field.into(), analyzer);
    }

    /// Get the analyzer for a specific field.
    pub fn get_analyzer(&self, field: &str) -> &Arc<dyn Analyzer> {
        self.field_analyzers
            .get(field)
            .unwrap_or(&self.default_analyzer)
    }

    /// Analyze text with the analyzer for the given field.
    pub fn analyze_field(&self, field: &str, text: &str) -> Result<TokenStream> {
        self.get_analyzer(field).analyze(text)
    }

    /// Analyze text with the analyzer for the given field and collect terms.
    pub fn field_terms(&self, field: &str, text: &str) -> Result<Vec<String>> {
        self.get_analyzer(field).terms(text)
    }
}

impl Analyzer for PerFieldAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.default_analyzer.analyze(text)
    }

    fn name(&self) -> &'static str {
        "per_field"
    }
}

impl std::fmt::Debug for PerFieldAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<(&String, &'static str)> = self
            .field_analyzers
            .iter()
            .map(|(field, analyzer)| (field, analyzer.name()))
            .collect();
        fields.sort();

        f.debug_struct("PerFieldAnalyzer")
            .field("default", &self.default_analyzer.name())
            .field("fields", &fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::english::EnglishAnalyzer;
    use crate::analysis::analyzer::keyword::KeywordAnalyzer;

    #[test]
    fn test_per_field_analyzer() {
        let mut analyzer = PerFieldAnalyzer::new(Arc::new(EnglishAnalyzer::new()));
        analyzer.add_analyzer("category", Arc::new(KeywordAnalyzer::lowercased()));

        assert_eq!(
            analyzer.field_terms("category", "Web Development").unwrap(),
            vec!["web development"]
        );
        assert_eq!(
            analyzer.field_terms("title", "Web Development").unwrap(),
            vec!["web", "development"]
        );
        assert_eq!(analyzer.get_analyzer("body").name(), "english");
        assert_eq!(analyzer.analyze("posts").unwrap().count(), 1);
    }
}
