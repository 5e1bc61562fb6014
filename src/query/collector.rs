//! Collectors gathering the best-scoring documents.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::index::segment::DocId;

/// A document and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreDoc {
    pub doc: DocId,
    pub score: f32,
}

impl ScoreDoc {
    /// Rank order: higher score first, then lower document id.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.doc.cmp(&other.doc))
    }
}

/// Heap entry ordered so that the worst hit is the greatest.
#[derive(Debug, Clone, Copy)]
struct Ranked(ScoreDoc);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Result of a top-k search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopDocs {
    /// Number of matching documents, not just the returned ones.
    pub total_hits: usize,
    /// Best hits, best first.
    pub score_docs: Vec<ScoreDoc>,
    pub max_score: f32,
}

/// Keeps the `n` best hits seen so far.
#[derive(Debug)]
pub struct TopDocsCollector {
    size: usize,
    heap: BinaryHeap<Ranked>,
    total_hits: usize,
}

impl TopDocsCollector {
    pub fn new(size: usize) -> Self {
        TopDocsCollector {
            size,
            heap: BinaryHeap::with_capacity(size.min(1024) + 1),
            total_hits: 0,
        }
    }

    pub fn collect(&mut self, doc: DocId, score: f32) {
        self.total_hits += 1;
        if self.size == 0 {
            return;
        }
        self.heap.push(Ranked(ScoreDoc { doc, score }));
        if self.heap.len() > self.size {
            // Drop the current worst hit.
            self.heap.pop();
        }
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    pub fn top_docs(self) -> TopDocs {
        let score_docs: Vec<ScoreDoc> = self
            .heap
            .into_sorted_vec()
            .into_iter()
            .map(|Ranked(score_doc)| score_doc)
            .collect();
        let max_score = score_docs.first().map(|d| d.score).unwrap_or(f32::NAN);
        TopDocs {
            total_hits: self.total_hits,
            score_docs,
            max_score,
        }
    }
}
