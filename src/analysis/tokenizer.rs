//! Tokenizers split raw text into tokens.
//!
//! - [`regex::RegexTokenizer`] - tokens are regex matches (`\w+` by default)
//! - [`whitespace::WhitespaceTokenizer`] - splits on whitespace
//! - [`unicode_word::UnicodeWordTokenizer`] - Unicode word boundaries
//! - [`keyword::KeywordTokenizer`] - the whole input as one token

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod keyword;
pub mod regex;
pub mod unicode_word;
pub mod whitespace;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}
