//! Text analysis: turning field text into index terms.
//!
//! An [`Analyzer`](analyzer::Analyzer) runs a tokenizer followed by a chain of
//! token filters:
//!
//! ```text
//! Raw Text → Tokenizer → Lowercase → Stop Words → Stemmer → Terms
//! ```
//!
//! The same analyzer is applied to a field at index time and to the query
//! text at search time, so both sides agree on the term vocabulary.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::Analyzer;
pub use analyzer::english::EnglishAnalyzer;
pub use analyzer::keyword::KeywordAnalyzer;
pub use analyzer::per_field::PerFieldAnalyzer;
pub use analyzer::pipeline::PipelineAnalyzer;
pub use token::{Token, TokenStream};
