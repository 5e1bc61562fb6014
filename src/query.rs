//! Queries over a [`LeafReader`](crate::index::LeafReader).
//!
//! Queries produce [`Matcher`]s that walk matching documents in ascending
//! id order with a score for each. The JSON query DSL is parsed into these
//! types by [`parser::JsonQueryParser`].

use std::any::Any;
use std::fmt::Debug;

use crate::error::Result;
use crate::index::LeafReader;

pub mod boolean;
pub mod collector;
pub mod match_all;
pub mod matcher;
pub mod more_like_this;
pub mod parser;
pub mod scorer;
pub mod term;
pub mod wildcard;

pub use boolean::{BooleanClause, BooleanQuery, Occur};
pub use collector::{ScoreDoc, TopDocs, TopDocsCollector};
pub use match_all::{MatchAllQuery, MatchNoneQuery};
pub use matcher::Matcher;
pub use more_like_this::MoreLikeThis;
pub use parser::{JsonQueryParser, QueryParser};
pub use term::TermQuery;
pub use wildcard::WildcardQuery;

/// Trait for search queries.
pub trait Query: Send + Sync + Debug {
    /// Create a matcher positioned on the first matching document.
    fn matcher(&self, reader: &LeafReader) -> Result<Box<dyn Matcher>>;

    /// Get the boost factor for this query.
    fn boost(&self) -> f32;

    /// Set the boost factor for this query.
    fn set_boost(&mut self, boost: f32);

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Get this query as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The field this query searches in, if it targets a single field.
    fn field(&self) -> Option<&str> {
        None
    }
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
