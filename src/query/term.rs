//! Exact term query.

use std::any::Any;

use crate::error::Result;
use crate::index::LeafReader;
use crate::query::Query;
use crate::query::matcher::{DocListMatcher, EmptyMatcher, Matcher};
use crate::query::scorer::{BM25Scorer, Scorer};

/// Matches documents containing an exact (already encoded) term.
#[derive(Debug, Clone)]
pub struct TermQuery {
    field: String,
    term: Vec<u8>,
    boost: f32,
}

impl TermQuery {
    pub fn new<F: Into<String>, T: Into<Vec<u8>>>(field: F, term: T) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn term(&self) -> &[u8] {
        &self.term
    }
}

impl Query for TermQuery {
    fn matcher(&self, reader: &LeafReader) -> Result<Box<dyn Matcher>> {
        let postings = reader.postings(&self.field, &self.term);
        if postings.is_empty() {
            return Ok(Box::new(EmptyMatcher::new()));
        }

        let stats = reader.field_stats(&self.field).unwrap_or_default();
        let avg_field_length = if stats.doc_count > 0 {
            stats.sum_total_term_freq as f32 / stats.doc_count as f32
        } else {
            0.0
        };
        let scorer = BM25Scorer::new(
            postings.len() as u64,
            u64::from(stats.doc_count),
            avg_field_length,
            self.boost,
        );

        let docs = postings
            .iter()
            .map(|posting| {
                let length = reader.field_length(&self.field, posting.doc) as f32;
                (posting.doc, scorer.score(posting.freq as f32, length))
            })
            .collect();
        Ok(Box::new(DocListMatcher::new(docs)))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}:{}", self.field, String::from_utf8_lossy(&self.term))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn field(&self) -> Option<&str> {
        Some(&self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::matcher::collect_all;
    use crate::test_support::leaf_reader;

    #[test]
    fn test_term_query_matches() {
        let reader = leaf_reader(&[
            ("body", "cheap pills cheap"),
            ("body", "team meeting"),
            ("body", "cheap flights"),
        ]);

        let mut matcher = TermQuery::new("body", "cheap").matcher(&reader).unwrap();
        let docs = collect_all(matcher.as_mut()).unwrap();
        assert_eq!(docs.iter().map(|(d, _)| *d).collect::<Vec<_>>(), vec![0, 2]);
        // Two occurrences outscore one.
        assert!(docs[0].1 > docs[1].1);
    }

    #[test]
    fn test_missing_term() {
        let reader = leaf_reader(&[("body", "hello")]);
        let matcher = TermQuery::new("body", "bye").matcher(&reader).unwrap();
        assert!(matcher.is_exhausted());
        assert_eq!(TermQuery::new("body", "bye").description(), "body:bye");
    }
}
