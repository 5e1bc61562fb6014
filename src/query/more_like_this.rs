//! "More like this": turns a piece of text into a disjunction of its most
//! characteristic terms.
//!
//! Terms are weighted by `tf * idf` with the classic
//! `idf = ln(num_docs / (doc_freq + 1)) + 1`; each term is queried in the
//! field where it is most frequent.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::trace;

use crate::analysis::Analyzer;
use crate::error::Result;
use crate::index::LeafReader;
use crate::query::boolean::BooleanQuery;
use crate::query::term::TermQuery;

pub const DEFAULT_MIN_TERM_FREQ: u32 = 2;
pub const DEFAULT_MIN_DOC_FREQ: u32 = 5;
pub const DEFAULT_MAX_DOC_FREQ: u32 = u32::MAX;
pub const DEFAULT_MAX_QUERY_TERMS: usize = 25;

/// A term selected for the generated query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTerm {
    pub word: String,
    pub field: String,
    pub score: f32,
    pub doc_freq: u32,
}

/// Builds "like this text" queries against one reader.
#[derive(Clone)]
pub struct MoreLikeThis {
    reader: LeafReader,
    analyzer: Arc<dyn Analyzer>,
    field_names: Vec<String>,
    min_term_freq: u32,
    min_doc_freq: u32,
    max_doc_freq: u32,
    max_query_terms: usize,
}

impl MoreLikeThis {
    pub fn new(reader: LeafReader, analyzer: Arc<dyn Analyzer>, field_names: Vec<String>) -> Self {
        MoreLikeThis {
            reader,
            analyzer,
            field_names,
            min_term_freq: DEFAULT_MIN_TERM_FREQ,
            min_doc_freq: DEFAULT_MIN_DOC_FREQ,
            max_doc_freq: DEFAULT_MAX_DOC_FREQ,
            max_query_terms: DEFAULT_MAX_QUERY_TERMS,
        }
    }

    /// Ignore words occurring fewer times than this in the text.
    pub fn set_min_term_freq(&mut self, min_term_freq: u32) {
        self.min_term_freq = min_term_freq;
    }

    /// Ignore words found in fewer documents than this.
    pub fn set_min_doc_freq(&mut self, min_doc_freq: u32) {
        self.min_doc_freq = min_doc_freq;
    }

    pub fn set_max_doc_freq(&mut self, max_doc_freq: u32) {
        self.max_doc_freq = max_doc_freq;
    }

    pub fn set_max_query_terms(&mut self, max_query_terms: usize) {
        self.max_query_terms = max_query_terms;
    }

    pub fn min_term_freq(&self) -> u32 {
        self.min_term_freq
    }

    pub fn min_doc_freq(&self) -> u32 {
        self.min_doc_freq
    }

    fn idf(doc_freq: u32, num_docs: u32) -> f32 {
        ((f64::from(num_docs) / (f64::from(doc_freq) + 1.0)).ln() + 1.0) as f32
    }

    /// The best terms of `text`, analyzed as `field_name`, best first.
    pub fn retrieve_terms(&self, text: &str) -> Result<Vec<ScoredTerm>> {
        let mut term_freqs: BTreeMap<String, u32> = BTreeMap::new();
        for word in self.analyzer.terms(text)? {
            *term_freqs.entry(word).or_insert(0) += 1;
        }

        let num_docs = self.reader.num_docs();
        let mut scored = Vec::new();
        for (word, tf) in term_freqs {
            if self.min_term_freq > 0 && tf < self.min_term_freq {
                continue;
            }

            let mut top_field = match self.field_names.first() {
                Some(field) => field.as_str(),
                None => break,
            };
            let mut doc_freq = 0;
            for field in &self.field_names {
                let freq = self.reader.doc_freq(field, word.as_bytes());
                if freq > doc_freq {
                    top_field = field.as_str();
                    doc_freq = freq;
                }
            }

            if (self.min_doc_freq > 0 && doc_freq < self.min_doc_freq)
                || doc_freq > self.max_doc_freq
                || doc_freq == 0
            {
                continue;
            }

            scored.push(ScoredTerm {
                score: tf as f32 * Self::idf(doc_freq, num_docs),
                field: top_field.to_string(),
                word,
                doc_freq,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.word.cmp(&b.word)));
        if self.max_query_terms > 0 {
            scored.truncate(self.max_query_terms);
        }
        Ok(scored)
    }

    /// A disjunction of term queries for the best terms of `text`.
    pub fn like(&self, field_name: &str, text: &str) -> Result<BooleanQuery> {
        let terms = self.retrieve_terms(text)?;
        trace!(
            "more like this on [{field_name}] selected {} terms",
            terms.len()
        );

        let mut query = BooleanQuery::new();
        for term in terms {
            query = query.should(Box::new(TermQuery::new(term.field, term.word.into_bytes())));
        }
        Ok(query)
    }
}

impl std::fmt::Debug for MoreLikeThis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoreLikeThis")
            .field("analyzer", &self.analyzer.name())
            .field("field_names", &self.field_names)
            .field("min_term_freq", &self.min_term_freq)
            .field("min_doc_freq", &self.min_doc_freq)
            .field("max_query_terms", &self.max_query_terms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::query::Query;
    use crate::query::matcher::collect_all;
    use crate::test_support::leaf_reader;

    fn mlt(reader: LeafReader) -> MoreLikeThis {
        MoreLikeThis::new(
            reader,
            Arc::new(StandardAnalyzer::new().unwrap()),
            vec!["body".to_string()],
        )
    }

    #[test]
    fn test_defaults_filter_rare_terms() {
        let reader = leaf_reader(&[("body", "rust rust"), ("body", "go")]);
        // min_doc_freq 5 discards everything in a tiny index.
        assert!(mlt(reader).retrieve_terms("rust rust go go").unwrap().is_empty());
    }

    #[test]
    fn test_rarer_terms_rank_first() {
        let reader = leaf_reader(&[
            ("body", "common words rust"),
            ("body", "common words"),
            ("body", "common"),
        ]);
        let mut mlt = mlt(reader.clone());
        mlt.set_min_doc_freq(1);
        mlt.set_min_term_freq(1);

        let terms = mlt.retrieve_terms("common rust words").unwrap();
        let words: Vec<&str> = terms.iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["rust", "words", "common"]);
        assert_eq!(terms[0].doc_freq, 1);

        let query = mlt.like("body", "rust").unwrap();
        let mut matcher = query.matcher(&reader).unwrap();
        let docs = collect_all(matcher.as_mut()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, 0);
    }

    #[test]
    fn test_max_query_terms() {
        let reader = leaf_reader(&[("body", "a1 b1 c1")]);
        let mut mlt = mlt(reader);
        mlt.set_min_doc_freq(1);
        mlt.set_min_term_freq(1);
        mlt.set_max_query_terms(2);
        assert_eq!(mlt.retrieve_terms("a1 b1 c1").unwrap().len(), 2);
    }
}
