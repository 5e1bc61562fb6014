//! Text analysis: turning field values and probe text into index terms.
//!
//! The same analyzers are used when documents are indexed and when a
//! classifier tokenizes the probe text, so terms always line up.

pub mod analyzer;
pub mod registry;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::Analyzer;
pub use registry::AnalysisRegistry;
pub use token::{Token, TokenStream};
