//! The classify response and its shard failure records.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::classification::ClassifyResult;
use crate::error::{ErrorKind, Result, SarissaError};
use crate::index::ShardId;

/// Why one shard group produced no result.
#[derive(Debug)]
pub struct ShardFailure {
    shard_id: ShardId,
    node_id: Option<String>,
    cause: SarissaError,
}

impl ShardFailure {
    pub fn new(shard_id: ShardId, node_id: Option<String>, cause: SarissaError) -> Self {
        ShardFailure {
            shard_id,
            node_id,
            cause,
        }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn cause(&self) -> &SarissaError {
        &self.cause
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    pub fn into_cause(self) -> SarissaError {
        self.cause
    }

    pub fn to_json(&self) -> Value {
        let mut reason = Map::new();
        reason.insert("type".into(), json!(self.cause.kind().as_str()));
        reason.insert("reason".into(), json!(self.cause.to_string()));
        let root = self.cause.root_cause();
        if !std::ptr::eq(root, &self.cause) {
            reason.insert(
                "caused_by".into(),
                json!({"type": root.kind().as_str(), "reason": root.to_string()}),
            );
        }
        json!({
            "index": self.shard_id.index,
            "shard": self.shard_id.id,
            "node": self.node_id,
            "reason": reason,
        })
    }
}

impl fmt::Display for ShardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shard_id)?;
        if let Some(node) = &self.node_id {
            write!(f, "[{node}]")?;
        }
        write!(f, ": {}", self.cause.detailed_message())
    }
}

/// The merged outcome of a classify request across all shard groups.
#[derive(Debug)]
pub struct ClassifyResponse {
    pub(crate) eval_on: String,
    pub(crate) class_field: String,
    pub(crate) result: ClassifyResult,
    pub(crate) top_n: usize,
    pub(crate) total_shards: usize,
    pub(crate) successful_shards: usize,
    pub(crate) shard_failures: Vec<ShardFailure>,
    pub(crate) took_in_millis: u64,
}

impl ClassifyResponse {
    pub fn eval_on(&self) -> &str {
        &self.eval_on
    }

    pub fn class_field(&self) -> &str {
        &self.class_field
    }

    /// Averaged class scores of the successful shards.
    pub fn result(&self) -> &ClassifyResult {
        &self.result
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn total_shards(&self) -> usize {
        self.total_shards
    }

    pub fn successful_shards(&self) -> usize {
        self.successful_shards
    }

    pub fn failed_shards(&self) -> usize {
        self.shard_failures.len()
    }

    pub fn shard_failures(&self) -> &[ShardFailure] {
        &self.shard_failures
    }

    pub fn took_in_millis(&self) -> u64 {
        self.took_in_millis
    }

    /// The response, or the first shard failure when no shard succeeded.
    pub fn into_result(mut self) -> Result<Self> {
        if self.successful_shards == 0 && !self.shard_failures.is_empty() {
            return Err(self.shard_failures.remove(0).into_cause());
        }
        Ok(self)
    }

    /// Render as the REST response body.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("took".into(), json!(self.took_in_millis));
        body.insert("text".into(), json!(self.eval_on));
        body.insert("class".into(), json!(self.class_field));
        if self.successful_shards > 0 {
            body.insert("scores".into(), json!(self.result.top(self.top_n)));
        }
        body.insert(
            "_shards".into(),
            json!({
                "total": self.total_shards,
                "successful": self.successful_shards,
                "failed": self.failed_shards(),
            }),
        );
        if !self.shard_failures.is_empty() {
            body.insert(
                "failures".into(),
                Value::Array(self.shard_failures.iter().map(ShardFailure::to_json).collect()),
            );
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ClassificationResult;
    use crate::codec::ClassValue;

    fn response(successful: usize, failures: Vec<ShardFailure>) -> ClassifyResponse {
        let result = if successful > 0 {
            ClassifyResult::from_results(vec![
                ClassificationResult::new(ClassValue::from("x"), 0.6),
                ClassificationResult::new(ClassValue::from("y"), 0.4),
            ])
        } else {
            ClassifyResult::new()
        };
        ClassifyResponse {
            eval_on: "probe".to_string(),
            class_field: "topic".to_string(),
            result,
            top_n: 1,
            total_shards: successful + failures.len(),
            successful_shards: successful,
            shard_failures: failures,
            took_in_millis: 3,
        }
    }

    fn failure(id: u32) -> ShardFailure {
        ShardFailure::new(
            ShardId::new("news", id),
            Some("node-1".to_string()),
            SarissaError::training(
                "failed to train model",
                SarissaError::unsupported_arity("only one text field is supported"),
            ),
        )
    }

    #[test]
    fn test_render() {
        let body = response(2, vec![failure(2)]).to_json();
        assert_eq!(body["took"], 3);
        assert_eq!(body["text"], "probe");
        assert_eq!(body["class"], "topic");
        assert_eq!(body["scores"], json!([{"value": "x", "score": 0.6}]));
        assert_eq!(body["_shards"], json!({"total": 3, "successful": 2, "failed": 1}));
        assert_eq!(body["failures"][0]["shard"], 2);
        assert_eq!(body["failures"][0]["reason"]["type"], "training_exception");
        assert_eq!(
            body["failures"][0]["reason"]["caused_by"]["type"],
            "unsupported_arity_exception"
        );
    }

    #[test]
    fn test_zero_successes() {
        let response = response(0, vec![failure(0), failure(1)]);
        let body = response.to_json();
        assert!(body.get("scores").is_none());
        assert_eq!(body["failures"].as_array().unwrap().len(), 2);

        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
    }

    #[test]
    fn test_partial_success_is_ok() {
        let response = response(1, vec![failure(1)]).into_result().unwrap();
        assert_eq!(response.failed_shards(), 1);
        assert!(response.to_json().get("failures").is_some());
        let empty = super::ClassifyResponse {
            shard_failures: Vec::new(),
            ..response
        };
        assert!(empty.to_json().get("failures").is_none());
    }
}
