//! Analyzers combine a tokenizer with token filters.
//!
//! - [`english::EnglishAnalyzer`] - text fields
//! - [`simple::SimpleAnalyzer`] - word split and lowercase only, for prefix terms
//! - [`keyword::KeywordAnalyzer`] - whole value, optionally lowercased
//! - [`pipeline::PipelineAnalyzer`] - custom tokenizer and filter chains
//! - [`per_field::PerFieldAnalyzer`] - resolves the analyzer of each schema field

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &'static str;

    /// Analyze and collect the surviving term texts in order.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.text).collect())
    }
}

pub mod english;
pub mod keyword;
pub mod per_field;
pub mod pipeline;
pub mod simple;
