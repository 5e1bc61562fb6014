//! Source documents and their flattened field values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SarissaError};

/// A scalar value found in a document source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Convert a JSON scalar; `null`, arrays and objects yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Integer)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The value as text, as a stored string field would hold it.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// A document as submitted for indexing: identifier, type and JSON source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_type")]
    pub doc_type: String,

    #[serde(rename = "_routing", default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,

    #[serde(rename = "_source")]
    pub source: Value,
}

impl StoredDocument {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, doc_type: T, source: Value) -> Self {
        StoredDocument {
            id: id.into(),
            doc_type: doc_type.into(),
            routing: None,
            source,
        }
    }

    pub fn with_routing<S: Into<String>>(mut self, routing: S) -> Self {
        self.routing = Some(routing.into());
        self
    }

    /// The key used to pick this document's shard.
    pub fn routing_key(&self) -> &str {
        self.routing.as_deref().unwrap_or(&self.id)
    }

    /// All values of `field` (a dotted path), in source order.
    pub fn values(&self, field: &str) -> Vec<FieldValue> {
        let mut current = vec![&self.source];
        for part in field.split('.') {
            current = current
                .into_iter()
                .flat_map(|value| match value {
                    Value::Array(items) => items.iter().collect::<Vec<_>>(),
                    other => vec![other],
                })
                .filter_map(|value| value.get(part))
                .collect();
        }

        let mut values = Vec::new();
        for value in current {
            collect_scalars(value, &mut values);
        }
        values
    }

    /// The first value of `field`, if any.
    pub fn first_value(&self, field: &str) -> Option<FieldValue> {
        self.values(field).into_iter().next()
    }

    /// Flatten the source into dotted field paths with their scalar values.
    pub fn flatten(&self) -> Result<BTreeMap<String, Vec<FieldValue>>> {
        let object = self.source.as_object().ok_or_else(|| {
            SarissaError::invalid_argument(format!(
                "source of document [{}] must be an object",
                self.id
            ))
        })?;

        let mut fields = BTreeMap::new();
        for (key, value) in object {
            flatten_into(key, value, &mut fields);
        }
        Ok(fields)
    }
}

fn collect_scalars(value: &Value, out: &mut Vec<FieldValue>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_scalars(item, out)),
        other => out.extend(FieldValue::from_json(other)),
    }
}

fn flatten_into(path: &str, value: &Value, fields: &mut BTreeMap<String, Vec<FieldValue>>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{path}.{key}"), child, fields);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_into(path, item, fields);
            }
        }
        scalar => {
            if let Some(value) = FieldValue::from_json(scalar) {
                fields.entry(path.to_string()).or_default().push(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_and_arrays() {
        let doc = StoredDocument::new(
            "1",
            "post",
            json!({
                "title": "hello",
                "tags": ["a", "b"],
                "author": {"name": "ann", "age": 30},
                "missing": null
            }),
        );

        let fields = doc.flatten().unwrap();
        assert_eq!(fields["title"], vec![FieldValue::Text("hello".into())]);
        assert_eq!(
            fields["tags"],
            vec![FieldValue::Text("a".into()), FieldValue::Text("b".into())]
        );
        assert_eq!(fields["author.age"], vec![FieldValue::Integer(30)]);
        assert!(!fields.contains_key("missing"));
    }

    #[test]
    fn test_values_by_path() {
        let doc = StoredDocument::new(
            "1",
            "post",
            json!({"comments": [{"stars": 4}, {"stars": 2.5}], "ok": true}),
        );

        assert_eq!(
            doc.values("comments.stars"),
            vec![FieldValue::Integer(4), FieldValue::Float(2.5)]
        );
        assert_eq!(doc.first_value("ok"), Some(FieldValue::Boolean(true)));
        assert_eq!(doc.first_value("nope"), None);
    }

    #[test]
    fn test_routing_key() {
        let doc = StoredDocument::new("7", "post", json!({}));
        assert_eq!(doc.routing_key(), "7");
        assert_eq!(doc.with_routing("user-1").routing_key(), "user-1");
    }

    #[test]
    fn test_non_object_source() {
        let doc = StoredDocument::new("1", "post", json!([1, 2]));
        assert!(doc.flatten().is_err());
    }
}
