//! # Sarissa Classify
//!
//! Distributed text classification over a sharded inverted index.
//!
//! A classify request names an index, the text fields to learn from, the
//! field holding each document's class and a text to evaluate. Every shard
//! group trains its own model (naive Bayes, boolean perceptron or k-nearest
//! neighbours) on the documents it holds and scores the text; the
//! coordinator averages the per-shard class scores.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Flexible text analysis pipeline
//! - In-memory segments with BM25 scoring and a JSON query DSL
//! - Scatter/gather execution with failover to replica copies
//! - An in-process multi-node cluster for tests and the CLI

pub mod action;
pub mod analysis;
pub mod classification;
pub mod cli;
pub mod cluster;
pub mod codec;
pub mod document;
pub mod error;
pub mod index;
pub mod indices;
pub mod node;
pub mod query;
pub mod schema;
pub mod settings;
pub mod transport;
pub mod util;

#[cfg(test)]
mod test_support;

pub mod prelude {
    pub use crate::action::{ClassifyConfig, ClassifyRequest, ClassifyResponse, TransportClassifyAction};
    pub use crate::classification::{ClassifyResult, ModelType};
    pub use crate::codec::ClassValue;
    pub use crate::error::{Result, SarissaError};
    pub use crate::node::LocalCluster;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
