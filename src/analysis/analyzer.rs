//! Analyzers combine a tokenizer with a chain of filters.
//!
//! - [`pipeline::PipelineAnalyzer`] - any tokenizer plus filters
//! - [`standard::StandardAnalyzer`] - `\w+` words, lowercased, English stop words removed
//! - [`simple::SimpleAnalyzer`] - Unicode words, lowercased
//! - [`whitespace::WhitespaceAnalyzer`] - whitespace separated, case preserved
//! - [`keyword::KeywordAnalyzer`] - the whole value as one term

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod keyword;
pub mod pipeline;
pub mod simple;
pub mod standard;
pub mod whitespace;

/// Trait for analyzers that convert text into processed tokens.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text into a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &str;

    /// The surviving term texts, in order, duplicates kept.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .analyze(text)?
            .filter(|token| !token.is_stopped())
            .map(|token| token.text)
            .collect())
    }
}
