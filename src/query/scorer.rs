//! Relevance scoring.

use std::fmt::Debug;

/// Scores one term occurrence count in a document.
pub trait Scorer: Send + Sync + Debug {
    /// Score a document with `term_freq` occurrences in a field of
    /// `field_length` terms.
    fn score(&self, term_freq: f32, field_length: f32) -> f32;

    /// Get the name of this scorer.
    fn name(&self) -> &'static str;
}

/// Okapi BM25 with the usual `k1 = 1.2`, `b = 0.75`.
#[derive(Debug, Clone)]
pub struct BM25Scorer {
    doc_freq: u64,
    doc_count: u64,
    avg_field_length: f32,
    boost: f32,
    k1: f32,
    b: f32,
}

impl BM25Scorer {
    /// `doc_count` is the number of documents that have the field.
    pub fn new(doc_freq: u64, doc_count: u64, avg_field_length: f32, boost: f32) -> Self {
        BM25Scorer {
            doc_freq,
            doc_count,
            avg_field_length,
            boost,
            k1: 1.2,
            b: 0.75,
        }
    }

    pub fn with_params(mut self, k1: f32, b: f32) -> Self {
        self.k1 = k1;
        self.b = b;
        self
    }

    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`, never negative.
    pub fn idf(&self) -> f32 {
        let n = self.doc_count as f32;
        let df = self.doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn tf(&self, term_freq: f32, field_length: f32) -> f32 {
        if term_freq <= 0.0 {
            return 0.0;
        }
        let norm = if self.avg_field_length > 0.0 {
            1.0 - self.b + self.b * (field_length / self.avg_field_length)
        } else {
            1.0
        };
        (term_freq * (self.k1 + 1.0)) / (term_freq + self.k1 * norm)
    }
}

impl Scorer for BM25Scorer {
    fn score(&self, term_freq: f32, field_length: f32) -> f32 {
        if self.doc_freq == 0 {
            return 0.0;
        }
        self.boost * self.idf() * self.tf(term_freq, field_length)
    }

    fn name(&self) -> &'static str {
        "BM25"
    }
}

/// Gives every matching document the same score.
#[derive(Debug, Clone)]
pub struct ConstantScorer {
    score: f32,
}

impl ConstantScorer {
    pub fn new(score: f32) -> Self {
        ConstantScorer { score }
    }
}

impl Scorer for ConstantScorer {
    fn score(&self, _term_freq: f32, _field_length: f32) -> f32 {
        self.score
    }

    fn name(&self) -> &'static str {
        "constant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rare_terms_score_higher() {
        let rare = BM25Scorer::new(1, 100, 10.0, 1.0);
        let common = BM25Scorer::new(50, 100, 10.0, 1.0);
        assert!(rare.score(1.0, 10.0) > common.score(1.0, 10.0));
    }

    #[test]
    fn test_tf_saturates() {
        let scorer = BM25Scorer::new(5, 100, 10.0, 1.0);
        let once = scorer.score(1.0, 10.0);
        let twice = scorer.score(2.0, 10.0);
        let many = scorer.score(100.0, 10.0);
        assert!(twice > once);
        assert!(many < scorer.boost * scorer.idf() * (scorer.k1 + 1.0));
    }

    #[test]
    fn test_shorter_fields_score_higher() {
        let scorer = BM25Scorer::new(5, 100, 10.0, 1.0);
        assert!(scorer.score(1.0, 5.0) > scorer.score(1.0, 20.0));
        assert_eq!(BM25Scorer::new(0, 100, 10.0, 1.0).score(1.0, 10.0), 0.0);
    }

    #[test]
    fn test_idf_is_positive_for_common_terms() {
        assert!(BM25Scorer::new(100, 100, 3.0, 1.0).idf() > 0.0);
        assert_eq!(ConstantScorer::new(2.0).score(7.0, 1.0), 2.0);
    }
}
