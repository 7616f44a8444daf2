//! Keyword analyzer for whole-value fields.

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::tokenizer::whole::WholeTokenizer;
use crate::error::Result;

/// Treats the entire (trimmed) input as one term.
///
/// `KeywordAnalyzer::lowercased()` folds case, for fields such as a category
/// where `"Rust"` and `"rust"` are the same value. `KeywordAnalyzer::new()`
/// keeps the value exactly, for opaque identifiers.
#[derive(Debug)]
pub struct KeywordAnalyzer {
    inner: PipelineAnalyzer,
    lowercase: bool,
}

impl KeywordAnalyzer {
    /// Exact-value keyword analyzer.
    pub fn new() -> Self {
        KeywordAnalyzer {
            inner: PipelineAnalyzer::new(Arc::new(WholeTokenizer::new())).with_name("keyword"),
            lowercase: false,
        }
    }

    /// Case-folding keyword analyzer.
    pub fn lowercased() -> Self {
        KeywordAnalyzer {
            inner: PipelineAnalyzer::new(Arc::new(WholeTokenizer::new()))
                .add_filter(Arc::new(LowercaseFilter::new()))
                .with_name("keyword_lowercase"),
            lowercase: true,
        }
    }

    /// Whether this analyzer folds case.
    pub fn is_lowercase(&self) -> bool {
        self.lowercase
    }
}

impl Default for KeywordAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        if self.lowercase {
            "keyword_lowercase"
        } else {
            "keyword"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_exact() {
        let analyzer = KeywordAnalyzer::new();
        assert_eq!(analyzer.terms(" User-42 ").unwrap(), vec!["User-42"]);
        assert!(!analyzer.is_lowercase());
        assert_eq!(analyzer.name(), "keyword");
    }

    #[test]
    fn test_keyword_lowercased() {
        let analyzer = KeywordAnalyzer::lowercased();
        assert_eq!(analyzer.terms("Web Development").unwrap(), vec!["web development"]);
        assert!(analyzer.terms("").unwrap().is_empty());
        assert_eq!(analyzer.name(), "keyword_lowercase");
    }
}
