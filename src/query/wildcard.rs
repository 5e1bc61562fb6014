//! Wildcard and prefix queries over a field's term dictionary.

use std::any::Any;
use std::sync::Arc;

use regex::Regex;

use crate::error::{Result, SarissaError};
use crate::index::LeafReader;
use crate::query::Query;
use crate::query::matcher::{DocListMatcher, EmptyMatcher, Matcher};

/// Matches documents with at least one term matching a wildcard pattern.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
/// - `\` escapes the following character
///
/// Matching documents get a constant score equal to the boost.
#[derive(Debug, Clone)]
pub struct WildcardQuery {
    field: String,
    pattern: String,
    regex: Arc<Regex>,
    boost: f32,
}

impl WildcardQuery {
    pub fn new<F: Into<String>, P: Into<String>>(field: F, pattern: P) -> Result<Self> {
        let pattern = pattern.into();
        let regex = Self::compile_pattern(&pattern)?;

        Ok(WildcardQuery {
            field: field.into(),
            pattern,
            regex: Arc::new(regex),
            boost: 1.0,
        })
    }

    /// Terms starting with `prefix`, taken literally.
    pub fn prefix<F: Into<String>>(field: F, prefix: &str) -> Result<Self> {
        let mut pattern = String::with_capacity(prefix.len() + 1);
        for ch in prefix.chars() {
            if matches!(ch, '*' | '?' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('*');
        Self::new(field, pattern)
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn compile_pattern(pattern: &str) -> Result<Regex> {
        let mut regex_pattern = String::from("(?s)^");
        let mut chars = pattern.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '*' => regex_pattern.push_str(".*"),
                '?' => regex_pattern.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => regex_pattern.push_str(&regex::escape(&escaped.to_string())),
                    None => regex_pattern.push_str(r"\\"),
                },
                other => regex_pattern.push_str(&regex::escape(&other.to_string())),
            }
        }
        regex_pattern.push('$');

        Regex::new(&regex_pattern).map_err(|e| {
            SarissaError::query_parse(format!("invalid wildcard pattern [{pattern}]: {e}"))
        })
    }

    /// Whether `term` matches the pattern.
    pub fn matches(&self, term: &[u8]) -> bool {
        self.regex.is_match(&String::from_utf8_lossy(term))
    }
}

impl Query for WildcardQuery {
    fn matcher(&self, reader: &LeafReader) -> Result<Box<dyn Matcher>> {
        let Some(terms) = reader.terms(&self.field) else {
            return Ok(Box::new(EmptyMatcher::new()));
        };

        let mut docs: Vec<u32> = terms
            .iter()
            .filter(|(term, _)| self.matches(term))
            .flat_map(|(term, _)| reader.postings(&self.field, term))
            .map(|posting| posting.doc)
            .collect();
        docs.sort_unstable();
        docs.dedup();

        Ok(Box::new(DocListMatcher::new(
            docs.into_iter().map(|doc| (doc, self.boost)).collect(),
        )))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}:{}", self.field, self.pattern)
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
