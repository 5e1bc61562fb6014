//! Named analyzers available to index mappings and requests.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::keyword::KeywordAnalyzer;
use crate::analysis::analyzer::simple::SimpleAnalyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::analysis::analyzer::whitespace::WhitespaceAnalyzer;
use crate::error::{Result, SarissaError};

/// Name of the analyzer used when nothing else is configured.
pub const DEFAULT_ANALYZER: &str = "standard";

/// A name → analyzer table with a default entry.
#[derive(Clone)]
pub struct AnalysisRegistry {
    analyzers: AHashMap<String, Arc<dyn Analyzer>>,
    default_name: String,
}

impl AnalysisRegistry {
    /// A registry holding the built-in analyzers
    /// (`standard`, `simple`, `whitespace`, `keyword`).
    pub fn new() -> Result<Self> {
        let mut registry = AnalysisRegistry {
            analyzers: AHashMap::new(),
            default_name: DEFAULT_ANALYZER.to_string(),
        };
        registry.register("standard", Arc::new(StandardAnalyzer::new()?));
        registry.register("simple", Arc::new(SimpleAnalyzer::new()));
        registry.register("whitespace", Arc::new(WhitespaceAnalyzer::new()));
        registry.register("keyword", Arc::new(KeywordAnalyzer::new()));
        Ok(registry)
    }

    /// Add or replace an analyzer under `name`.
    pub fn register<S: Into<String>>(&mut self, name: S, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.insert(name.into(), analyzer);
    }

    /// Change which registered analyzer is the default.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.analyzers.contains_key(name) {
            return Err(SarissaError::invalid_argument(format!(
                "failed to find analyzer [{name}]"
            )));
        }
        self.default_name = name.to_string();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.get(name).cloned()
    }

    /// Look up an analyzer, failing with `InvalidArgument` when it is unknown.
    pub fn analyzer(&self, name: &str) -> Result<Arc<dyn Analyzer>> {
        self.get(name).ok_or_else(|| {
            SarissaError::invalid_argument(format!("failed to find analyzer [{name}]"))
        })
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn default_analyzer(&self) -> Result<Arc<dyn Analyzer>> {
        self.analyzer(&self.default_name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.analyzers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for AnalysisRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisRegistry")
            .field("analyzers", &self.names())
            .field("default", &self.default_name)
            .finish()
    }
}
