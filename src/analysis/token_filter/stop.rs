//! Stop word filter.
//!
//! # Examples
//!
//! ```
//! use sarissa_classify::analysis::token::Token;
//! use sarissa_classify::analysis::token_filter::Filter;
//! use sarissa_classify::analysis::token_filter::stop::StopFilter;
//!
//! let tokens = vec![Token::new("the", 0), Token::new("quick", 1)];
//! let result: Vec<_> = StopFilter::new()
//!     .filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(result[0].text, "quick");
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

lazy_static! {
    /// The classic English stop word set.
    pub static ref ENGLISH_STOP_WORDS: Arc<HashSet<String>> = Arc::new(
        [
            "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into",
            "is", "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then",
            "there", "these", "they", "this", "to", "was", "will", "with",
        ]
        .iter()
        .map(|word| word.to_string())
        .collect()
    );
}

/// A filter that drops (or marks) stop words.
#[derive(Clone, Debug)]
pub struct StopFilter {
    stop_words: Arc<HashSet<String>>,
    remove_stopped: bool,
}

impl StopFilter {
    /// Create a filter with the English stop word set that removes matches.
    pub fn new() -> Self {
        StopFilter {
            stop_words: Arc::clone(&ENGLISH_STOP_WORDS),
            remove_stopped: true,
        }
    }

    /// Create a filter from a custom word list.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopFilter {
            stop_words: Arc::new(words.into_iter().map(Into::into).collect()),
            remove_stopped: true,
        }
    }

    /// Keep stop words in the stream, marked as stopped.
    pub fn mark_only(mut self) -> Self {
        self.remove_stopped = false;
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stop_words = Arc::clone(&self.stop_words);
        let remove = self.remove_stopped;

        Ok(Box::new(tokens.filter_map(move |token| {
            if token.is_stopped() || !stop_words.contains(&token.text) {
                Some(token)
            } else if remove {
                None
            } else {
                Some(token.stop())
            }
        })))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    fn stream(words: &[&str]) -> TokenStream {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        Box::new(tokens.into_iter())
    }

    #[test]
    fn test_mark_only() {
        let result: Vec<Token> = StopFilter::new()
            .mark_only()
            .filter(stream(&["and", "rust"]))
            .unwrap()
            .collect();

        assert_eq!(result.len(), 2);
        assert!(result[0].is_stopped());
        assert!(!result[1].is_stopped());
    }

    #[test]
    fn test_custom_words() {
        let filter = StopFilter::from_words(["foo"]);
        let result: Vec<Token> = filter.filter(stream(&["foo", "the"])).unwrap().collect();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "the");
    }
}
