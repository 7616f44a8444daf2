//! Tokenizers split input text into tokens.
//!
//! - [`unicode_word::UnicodeWordTokenizer`] - Unicode word boundaries, used for text fields
//! - [`whole::WholeTokenizer`] - the entire input is one token, used for keyword fields

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod unicode_word;
pub mod whole;
