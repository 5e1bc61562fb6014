//! Document iterators produced by queries.

use std::fmt::Debug;

use crate::error::Result;
use crate::index::segment::{DocId, NO_MORE_DOCS};

/// Iterates matching documents in ascending order.
///
/// A matcher starts positioned on its first document; `doc_id` returns
/// [`NO_MORE_DOCS`] once it is exhausted.
pub trait Matcher: Send + Debug {
    /// The current document id.
    fn doc_id(&self) -> DocId;

    /// Score of the current document.
    fn score(&self) -> f32;

    /// Advance to the next document; `false` when exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Advance to the first document `>= target`; `false` when exhausted.
    fn skip_to(&mut self, target: DocId) -> Result<bool>;

    /// Upper bound of the number of documents this matcher yields.
    fn cost(&self) -> u64;

    fn is_exhausted(&self) -> bool {
        self.doc_id() == NO_MORE_DOCS
    }
}

/// A matcher that matches nothing.
#[derive(Debug, Default)]
pub struct EmptyMatcher;

impl EmptyMatcher {
    pub fn new() -> Self {
        EmptyMatcher
    }
}

impl Matcher for EmptyMatcher {
    fn doc_id(&self) -> DocId {
        NO_MORE_DOCS
    }

    fn score(&self) -> f32 {
        0.0
    }

    fn next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn skip_to(&mut self, _target: DocId) -> Result<bool> {
        Ok(false)
    }

    fn cost(&self) -> u64 {
        0
    }
}

/// Matches every document `0..max_doc` with a constant score.
#[derive(Debug)]
pub struct AllMatcher {
    current: DocId,
    max_doc: DocId,
    score: f32,
}

impl AllMatcher {
    pub fn new(max_doc: DocId, score: f32) -> Self {
        AllMatcher {
            current: 0,
            max_doc,
            score,
        }
    }
}

impl Matcher for AllMatcher {
    fn doc_id(&self) -> DocId {
        if self.current >= self.max_doc {
            NO_MORE_DOCS
        } else {
            self.current
        }
    }

    fn score(&self) -> f32 {
        self.score
    }

    fn next(&mut self) -> Result<bool> {
        if self.current < self.max_doc {
            self.current += 1;
        }
        Ok(self.current < self.max_doc)
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.current = self.current.max(target).min(self.max_doc);
        Ok(self.current < self.max_doc)
    }

    fn cost(&self) -> u64 {
        u64::from(self.max_doc)
    }
}

/// Walks a precomputed, ascending list of scored documents.
#[derive(Debug)]
pub struct DocListMatcher {
    docs: Vec<(DocId, f32)>,
    position: usize,
}

impl DocListMatcher {
    /// `docs` must be sorted by document id without duplicates.
    pub fn new(docs: Vec<(DocId, f32)>) -> Self {
        debug_assert!(docs.windows(2).all(|w| w[0].0 < w[1].0));
        DocListMatcher { docs, position: 0 }
    }
}

impl Matcher for DocListMatcher {
    fn doc_id(&self) -> DocId {
        self.docs
            .get(self.position)
            .map(|(doc, _)| *doc)
            .unwrap_or(NO_MORE_DOCS)
    }

    fn score(&self) -> f32 {
        self.docs
            .get(self.position)
            .map(|(_, score)| *score)
            .unwrap_or(0.0)
    }

    fn next(&mut self) -> Result<bool> {
        if self.position < self.docs.len() {
            self.position += 1;
        }
        Ok(self.position < self.docs.len())
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        let rest = &self.docs[self.position..];
        self.position += rest.partition_point(|(doc, _)| *doc < target);
        Ok(self.position < self.docs.len())
    }

    fn cost(&self) -> u64 {
        self.docs.len() as u64
    }
}

/// Drain a matcher into `(doc, score)` pairs.
pub fn collect_all(matcher: &mut dyn Matcher) -> Result<Vec<(DocId, f32)>> {
    let mut docs = Vec::new();
    while !matcher.is_exhausted() {
        docs.push((matcher.doc_id(), matcher.score()));
        matcher.next()?;
    }
    Ok(docs)
}
