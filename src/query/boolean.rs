//! Boolean combination of queries.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::index::LeafReader;
use crate::index::segment::DocId;
use crate::query::Query;
use crate::query::matcher::{DocListMatcher, Matcher, collect_all};

/// How a clause takes part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// Must match; contributes to the score.
    Must,
    /// Optional unless there are no required clauses; contributes to the score.
    Should,
    /// Must not match.
    MustNot,
    /// Must match; does not contribute to the score.
    Filter,
}

#[derive(Debug, Clone)]
pub struct BooleanClause {
    pub query: Box<dyn Query>,
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }
}

/// A query combining clauses with must / should / must-not / filter semantics.
///
/// With no `Must` or `Filter` clause at least `max(1, minimum_should_match)`
/// `Should` clauses have to match. A query without any clause matches
/// nothing.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    minimum_should_match: usize,
    boost: f32,
}

impl BooleanQuery {
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            minimum_should_match: 0,
            boost: 1.0,
        }
    }

    pub fn add(&mut self, query: Box<dyn Query>, occur: Occur) {
        self.clauses.push(BooleanClause::new(query, occur));
    }

    pub fn must(mut self, query: Box<dyn Query>) -> Self {
        self.add(query, Occur::Must);
        self
    }

    pub fn should(mut self, query: Box<dyn Query>) -> Self {
        self.add(query, Occur::Should);
        self
    }

    pub fn must_not(mut self, query: Box<dyn Query>) -> Self {
        self.add(query, Occur::MustNot);
        self
    }

    pub fn filter(mut self, query: Box<dyn Query>) -> Self {
        self.add(query, Occur::Filter);
        self
    }

    pub fn with_minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = minimum;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn has_required(&self) -> bool {
        self.clauses
            .iter()
            .any(|c| matches!(c.occur, Occur::Must | Occur::Filter))
    }
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for BooleanQuery {
    fn matcher(&self, reader: &LeafReader) -> Result<Box<dyn Matcher>> {
        // Required clauses narrow the candidate set; start from "everything".
        let mut required: Option<BTreeMap<DocId, f32>> = None;
        let mut should: BTreeMap<DocId, (f32, usize)> = BTreeMap::new();
        let mut excluded: BTreeSet<DocId> = BTreeSet::new();

        for clause in &self.clauses {
            let mut matcher = clause.query.matcher(reader)?;
            let docs = collect_all(matcher.as_mut())?;
            match clause.occur {
                Occur::Must | Occur::Filter => {
                    let scored = clause.occur == Occur::Must;
                    required = Some(match required {
                        None => docs
                            .into_iter()
                            .map(|(doc, score)| (doc, if scored { score } else { 0.0 }))
                            .collect(),
                        Some(current) => {
                            let incoming: BTreeMap<DocId, f32> = docs.into_iter().collect();
                            current
                                .into_iter()
                                .filter_map(|(doc, score)| {
                                    incoming.get(&doc).map(|extra| {
                                        (doc, if scored { score + extra } else { score })
                                    })
                                })
                                .collect()
                        }
                    });
                }
                Occur::Should => {
                    for (doc, score) in docs {
                        let entry = should.entry(doc).or_insert((0.0, 0));
                        entry.0 += score;
                        entry.1 += 1;
                    }
                }
                Occur::MustNot => excluded.extend(docs.into_iter().map(|(doc, _)| doc)),
            }
        }

        let matched: Vec<(DocId, f32)> = if self.has_required() {
            let minimum = self.minimum_should_match;
            required
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(doc, score)| {
                    let (extra, count) = should.get(&doc).copied().unwrap_or((0.0, 0));
                    (count >= minimum).then_some((doc, score + extra))
                })
                .collect()
        } else {
            let minimum = self.minimum_should_match.max(1);
            should
                .into_iter()
                .filter(|(_, (_, count))| *count >= minimum)
                .map(|(doc, (score, _))| (doc, score))
                .collect()
        };

        let docs = matched
            .into_iter()
            .filter(|(doc, _)| !excluded.contains(doc))
            .map(|(doc, score)| (doc, score * self.boost))
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
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                let prefix = match clause.occur {
                    Occur::Must => "+",
                    Occur::Should => "",
                    Occur::MustNot => "-",
                    Occur::Filter => "#",
                };
                format!("{prefix}{}", clause.query.description())
            })
            .collect();
        format!("({})", parts.join(" "))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
