//! Stemming token filter and stemmer implementations.

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Trait for stemming algorithms.
pub trait Stemmer: Send + Sync {
    /// Stem a word to its root form.
    fn stem(&self, word: &str) -> String;

    /// Get the name of this stemmer.
    fn name(&self) -> &'static str;
}

/// Light English stemmer: strips possessives and plural suffixes only.
///
/// Aggressive stemmers conflate unrelated words, which hurts precision on
/// short post titles. This one only folds `'s`, `-s` and `-ies`:
///
/// - `rust's` → `rust`
/// - `posts` → `post`
/// - `queries` → `query`
/// - `class`, `status`, `goes` are left alone
#[derive(Clone, Debug, Default)]
pub struct EnglishMinimalStemmer;

impl EnglishMinimalStemmer {
    /// Create a new stemmer.
    pub fn new() -> Self {
        EnglishMinimalStemmer
    }

    fn strip_possessive(word: &str) -> &str {
        for suffix in ["'s", "\u{2019}s", "'S", "\u{2019}S"] {
            if let Some(stripped) = word.strip_suffix(suffix) {
                return stripped;
            }
        }
        word
    }

    fn strip_plural(word: &str) -> String {
        let chars: Vec<char> = word.chars().collect();
        let len = chars.len();

        if len < 3 || chars[len - 1] != 's' {
            return word.to_string();
        }

        match chars[len - 2] {
            'u' | 's' => word.to_string(),
            'e' => {
                if len > 3 && chars[len - 3] == 'i' && chars[len - 4] != 'a' && chars[len - 4] != 'e'
                {
                    let mut stem: String = chars[..len - 3].iter().collect();
                    stem.push('y');
                    return stem;
                }
                if matches!(chars[len - 3], 'i' | 'a' | 'o' | 'e') {
                    return word.to_string();
                }
                chars[..len - 1].iter().collect()
            }
            _ => chars[..len - 1].iter().collect(),
        }
    }
}

impl Stemmer for EnglishMinimalStemmer {
    fn stem(&self, word: &str) -> String {
        Self::strip_plural(Self::strip_possessive(word))
    }

    fn name(&self) -> &'static str {
        "english_minimal"
    }
}

/// Filter that applies stemming to tokens.
pub struct StemFilter {
    stemmer: Box<dyn Stemmer>,
}

impl std::fmt::Debug for StemFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemFilter")
            .field("stemmer", &self.stemmer.name())
            .finish()
    }
}

impl Default for StemFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl StemFilter {
    /// Create a new stem filter with the English minimal stemmer.
    pub fn new() -> Self {
        StemFilter {
            stemmer: Box::new(EnglishMinimalStemmer::new()),
        }
    }

    /// Create a stem filter with a custom stemmer.
    pub fn with_stemmer(stemmer: Box<dyn Stemmer>) -> Self {
        StemFilter { stemmer }
    }
}

impl Filter for StemFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stemmed: Vec<_> = tokens
            .map(|token| {
                if token.is_stopped() {
                    token
                } else {
                    let stem = self.stemmer.stem(&token.text);
                    token.with_text(stem)
                }
            })
            .collect();

        Ok(Box::new(stemmed.into_iter()))
    }

    fn name(&self) -> &'static str {
        "stem"
    }
}
