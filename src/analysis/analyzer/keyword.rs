//! Keyword analyzer: the whole value is one term.

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::keyword::KeywordTokenizer;
use crate::error::Result;

#[derive(Clone, Debug, Default)]
pub struct KeywordAnalyzer {
    tokenizer: KeywordTokenizer,
}

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.tokenizer.tokenize(text)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_analyzer() {
        let terms = KeywordAnalyzer::new().terms("Spam Folder").unwrap();
        assert_eq!(terms, vec!["Spam Folder"]);
    }
}
