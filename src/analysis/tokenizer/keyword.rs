//! Tokenizer that keeps the whole input as a single token.

use super::Tokenizer;
use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

#[derive(Clone, Debug, Default)]
pub struct KeywordTokenizer;

impl KeywordTokenizer {
    pub fn new() -> Self {
        KeywordTokenizer
    }
}

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        if text.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        Ok(Box::new(std::iter::once(Token::with_offsets(
            text,
            0,
            0,
            text.len(),
        ))))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
