//! Queries matching all or no documents.

use std::any::Any;

use crate::error::Result;
use crate::index::LeafReader;
use crate::query::Query;
use crate::query::matcher::{AllMatcher, EmptyMatcher, Matcher};

/// Matches every document with a constant score equal to its boost.
#[derive(Debug, Clone)]
pub struct MatchAllQuery {
    boost: f32,
}

impl MatchAllQuery {
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for MatchAllQuery {
    fn matcher(&self, reader: &LeafReader) -> Result<Box<dyn Matcher>> {
        Ok(Box::new(AllMatcher::new(reader.max_doc(), self.boost)))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        "*:*".to_string()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches nothing.
#[derive(Debug, Clone, Default)]
pub struct MatchNoneQuery;

impl MatchNoneQuery {
    pub fn new() -> Self {
        MatchNoneQuery
    }
}

impl Query for MatchNoneQuery {
    fn matcher(&self, _reader: &LeafReader) -> Result<Box<dyn Matcher>> {
        Ok(Box::new(EmptyMatcher::new()))
    }

    fn boost(&self) -> f32 {
        1.0
    }

    fn set_boost(&mut self, _boost: f32) {}

    fn description(&self) -> String {
        "MatchNoDocsQuery".to_string()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
