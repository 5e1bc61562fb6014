//! Error types for classification operations.
//!
//! All fallible operations in this crate return [`SarissaError`]. Errors
//! raised inside a shard pipeline are converted into shard failures by the
//! coordinator, which keeps their [`ErrorKind`] and message.
//!
//! # Examples
//!
//! ```
//! use sarissa_classify::error::{ErrorKind, Result, SarissaError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SarissaError::invalid_argument("unknown parameter [foo]"))
//! }
//!
//! let err = example_operation().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidArgument);
//! ```

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type.
#[derive(Error, Debug)]
pub enum SarissaError {
    /// I/O errors (engine reads, file loading, ...)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or unsupported arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more request validation failures.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// A field's declared type does not fit the requested operation.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A classifier received more text fields than it supports.
    #[error("Unsupported arity: {0}")]
    UnsupportedArity(String),

    /// A filter query could not be parsed.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    /// Training a classifier failed.
    #[error("Training error: {reason}")]
    Training {
        reason: String,
        #[source]
        source: Box<SarissaError>,
    },

    /// Evaluating a trained classifier failed.
    #[error("Evaluation error: {reason}")]
    Evaluation {
        reason: String,
        #[source]
        source: Box<SarissaError>,
    },

    /// No active copy of a shard is available.
    #[error("Shard unavailable: {0}")]
    ShardUnavailable(String),

    /// The requested index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The operation is blocked by a cluster or index block.
    #[error("Cluster blocked: {0}")]
    ClusterBlocked(String),

    /// Aggregation produced no class although shards succeeded.
    #[error("No winner: {0}")]
    NoWinner(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Errors sending requests between nodes.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The operation did not finish before its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with SarissaError.
pub type Result<T> = std::result::Result<T, SarissaError>;

/// Copyable classification of an error, carried by shard failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Io,
    InvalidArgument,
    Validation,
    SchemaMismatch,
    UnsupportedArity,
    QueryParse,
    Training,
    Evaluation,
    ShardUnavailable,
    IndexNotFound,
    ClusterBlocked,
    NoWinner,
    Analysis,
    Transport,
    Timeout,
    Cancelled,
    Serialization,
    Other,
}

impl ErrorKind {
    /// The name used for this kind in rendered responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io_exception",
            ErrorKind::InvalidArgument => "illegal_argument_exception",
            ErrorKind::Validation => "action_request_validation_exception",
            ErrorKind::SchemaMismatch => "schema_mismatch_exception",
            ErrorKind::UnsupportedArity => "unsupported_arity_exception",
            ErrorKind::QueryParse => "query_parsing_exception",
            ErrorKind::Training => "training_exception",
            ErrorKind::Evaluation => "evaluation_exception",
            ErrorKind::ShardUnavailable => "no_shard_available_action_exception",
            ErrorKind::IndexNotFound => "index_not_found_exception",
            ErrorKind::ClusterBlocked => "cluster_block_exception",
            ErrorKind::NoWinner => "no_winner_exception",
            ErrorKind::Analysis => "analysis_exception",
            ErrorKind::Transport => "transport_exception",
            ErrorKind::Timeout => "timeout_exception",
            ErrorKind::Cancelled => "task_cancelled_exception",
            ErrorKind::Serialization => "serialization_exception",
            ErrorKind::Other => "exception",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SarissaError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SarissaError::InvalidArgument(msg.into())
    }

    /// Create a new schema mismatch error.
    pub fn schema_mismatch<S: Into<String>>(msg: S) -> Self {
        SarissaError::SchemaMismatch(msg.into())
    }

    /// Create a new unsupported arity error.
    pub fn unsupported_arity<S: Into<String>>(msg: S) -> Self {
        SarissaError::UnsupportedArity(msg.into())
    }

    /// Create a new query parse error.
    pub fn query_parse<S: Into<String>>(msg: S) -> Self {
        SarissaError::QueryParse(msg.into())
    }

    /// Wrap `cause` as a training failure.
    pub fn training<S: Into<String>>(reason: S, cause: SarissaError) -> Self {
        SarissaError::Training {
            reason: reason.into(),
            source: Box::new(cause),
        }
    }

    /// Wrap `cause` as an evaluation failure.
    pub fn evaluation<S: Into<String>>(reason: S, cause: SarissaError) -> Self {
        SarissaError::Evaluation {
            reason: reason.into(),
            source: Box::new(cause),
        }
    }

    /// Create a new shard unavailable error.
    pub fn shard_unavailable<S: Into<String>>(msg: S) -> Self {
        SarissaError::ShardUnavailable(msg.into())
    }

    /// Create a new index not found error.
    pub fn index_not_found<S: Into<String>>(index: S) -> Self {
        SarissaError::IndexNotFound(index.into())
    }

    /// Create a new cluster blocked error.
    pub fn cluster_blocked<S: Into<String>>(msg: S) -> Self {
        SarissaError::ClusterBlocked(msg.into())
    }

    /// Create a new no winner error.
    pub fn no_winner<S: Into<String>>(msg: S) -> Self {
        SarissaError::NoWinner(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        SarissaError::Analysis(msg.into())
    }

    /// Create a new transport error.
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        SarissaError::Transport(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        SarissaError::Timeout(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        SarissaError::OperationCancelled(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SarissaError::Other(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        SarissaError::Other(format!("Internal error: {}", msg.into()))
    }

    /// The kind of this error, without unwrapping training/evaluation wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SarissaError::Io(_) => ErrorKind::Io,
            SarissaError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SarissaError::Validation(_) => ErrorKind::Validation,
            SarissaError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            SarissaError::UnsupportedArity(_) => ErrorKind::UnsupportedArity,
            SarissaError::QueryParse(_) => ErrorKind::QueryParse,
            SarissaError::Training { .. } => ErrorKind::Training,
            SarissaError::Evaluation { .. } => ErrorKind::Evaluation,
            SarissaError::ShardUnavailable(_) => ErrorKind::ShardUnavailable,
            SarissaError::IndexNotFound(_) => ErrorKind::IndexNotFound,
            SarissaError::ClusterBlocked(_) => ErrorKind::ClusterBlocked,
            SarissaError::NoWinner(_) => ErrorKind::NoWinner,
            SarissaError::Analysis(_) => ErrorKind::Analysis,
            SarissaError::Transport(_) => ErrorKind::Transport,
            SarissaError::Timeout(_) => ErrorKind::Timeout,
            SarissaError::OperationCancelled(_) => ErrorKind::Cancelled,
            SarissaError::Json(_) | SarissaError::Yaml(_) => ErrorKind::Serialization,
            SarissaError::Other(_) => ErrorKind::Other,
        }
    }

    /// The innermost error behind training and evaluation wrappers.
    pub fn root_cause(&self) -> &SarissaError {
        match self {
            SarissaError::Training { source, .. } | SarissaError::Evaluation { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Whether this error means the shard simply is not there.
    ///
    /// Such errors leave the shard slot inactive instead of counting as a
    /// failure.
    pub fn is_shard_not_available(&self) -> bool {
        matches!(
            self.root_cause(),
            SarissaError::ShardUnavailable(_) | SarissaError::IndexNotFound(_)
        )
    }

    /// A one-line description including every wrapped cause.
    pub fn detailed_message(&self) -> String {
        let mut message = self.to_string();
        let mut current: &dyn std::error::Error = self;
        while let Some(source) = current.source() {
            message.push_str("; caused by: ");
            message.push_str(&source.to_string());
            current = source;
        }
        message
    }
}

/// Accumulated request validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<String>,
}

impl ValidationErrors {
    /// Create an empty set of validation errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error message.
    pub fn add<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
    }

    /// The collected messages, in the order they were added.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SarissaError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validation Failed: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            write!(f, "{}: {};", i + 1, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SarissaError::invalid_argument("unknown model type [foo]");
        assert_eq!(
            error.to_string(),
            "Invalid argument: unknown model type [foo]"
        );

        let error = SarissaError::schema_mismatch("field [x] is binary");
        assert_eq!(error.to_string(), "Schema mismatch: field [x] is binary");
    }

    #[test]
    fn test_generic_errors_map_to_other() {
        for error in [SarissaError::other("boom"), SarissaError::internal("boom")] {
            assert_eq!(error.kind(), ErrorKind::Other);
            assert_eq!(error.kind().as_str(), "exception");
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = SarissaError::from(io_error);

        match error {
            SarissaError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_root_cause_unwraps_training() {
        let cause = SarissaError::unsupported_arity("two fields");
        let error = SarissaError::training("failed to train model", cause);

        assert_eq!(error.kind(), ErrorKind::Training);
        assert_eq!(error.root_cause().kind(), ErrorKind::UnsupportedArity);
        assert!(error.detailed_message().contains("two fields"));
    }

    #[test]
    fn test_shard_not_available() {
        assert!(SarissaError::shard_unavailable("[idx][0]").is_shard_not_available());
        assert!(!SarissaError::transport("node left").is_shard_not_available());
    }

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        errors.add("text to be evaluated is missing");
        errors.add("index on which to train the classifier is missing");

        assert_eq!(
            errors.to_string(),
            "Validation Failed: 1: text to be evaluated is missing;2: index on which to train the classifier is missing;"
        );
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
