//! JSON query DSL.
//!
//! Supported queries: `match_all`, `match_none`, `term`, `terms`, `match`,
//! `bool`, `wildcard`, `prefix` and `exists`. The document may be wrapped in
//! an outer `{"query": ...}` object.
//!
//! ```
//! use std::sync::Arc;
//! use sarissa_classify::analysis::AnalysisRegistry;
//! use sarissa_classify::index::mapper::DocumentMapper;
//! use sarissa_classify::query::parser::{JsonQueryParser, QueryParser};
//! use sarissa_classify::schema::Schema;
//!
//! let mapper = DocumentMapper::new(
//!     Arc::new(Schema::new()),
//!     Arc::new(AnalysisRegistry::new().unwrap()),
//! );
//! let parser = JsonQueryParser::new(mapper, "doc");
//! let query = parser.parse(br#"{"query": {"term": {"lang": "en"}}}"#).unwrap();
//! assert_eq!(query.description(), "lang:en");
//! ```

use serde_json::{Map, Value};

use crate::codec;
use crate::document::FieldValue;
use crate::error::{Result, SarissaError};
use crate::index::mapper::DocumentMapper;
use crate::query::Query;
use crate::query::boolean::{BooleanQuery, Occur};
use crate::query::match_all::{MatchAllQuery, MatchNoneQuery};
use crate::query::term::TermQuery;
use crate::query::wildcard::WildcardQuery;
use crate::schema::FieldKind;

/// Turns serialized query documents into executable queries.
pub trait QueryParser: Send + Sync {
    fn parse(&self, source: &[u8]) -> Result<Box<dyn Query>>;
}

/// Parser for the JSON query DSL, bound to one index's mappings.
#[derive(Clone)]
pub struct JsonQueryParser {
    mapper: DocumentMapper,
    doc_type: String,
}

impl JsonQueryParser {
    /// Fields are resolved against `doc_type` first, then any other type.
    pub fn new<S: Into<String>>(mapper: DocumentMapper, doc_type: S) -> Self {
        JsonQueryParser {
            mapper,
            doc_type: doc_type.into(),
        }
    }

    /// Parse an already decoded JSON value.
    pub fn parse_value(&self, value: &Value) -> Result<Box<dyn Query>> {
        let object = as_object(value, "query")?;
        if object.len() == 1 {
            if let Some(inner) = object.get("query") {
                return self.parse_query(inner);
            }
        }
        self.parse_query(value)
    }

    fn parse_query(&self, value: &Value) -> Result<Box<dyn Query>> {
        let object = as_object(value, "query")?;
        let mut entries = object.iter();
        let (name, body) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            (None, _) => {
                return Err(SarissaError::query_parse("query malformed, empty clause found"));
            }
            (Some(_), Some(_)) => {
                return Err(SarissaError::query_parse(
                    "query malformed, must contain exactly one query type",
                ));
            }
        };

        let mut query: Box<dyn Query> = match name.as_str() {
            "match_all" => Box::new(MatchAllQuery::new()),
            "match_none" => Box::new(MatchNoneQuery::new()),
            "term" => self.parse_term(body)?,
            "terms" => self.parse_terms(body)?,
            "match" => self.parse_match(body)?,
            "bool" => self.parse_bool(body)?,
            "wildcard" => self.parse_wildcard(body, false)?,
            "prefix" => self.parse_wildcard(body, true)?,
            "exists" => self.parse_exists(body)?,
            other => {
                return Err(SarissaError::query_parse(format!(
                    "no query registered for [{other}]"
                )));
            }
        };

        if let Some(boost) = boost_of(body)? {
            query.set_boost(boost);
        }
        Ok(query)
    }

    fn field_kind(&self, field: &str) -> FieldKind {
        self.mapper
            .schema()
            .resolve_field(&self.doc_type, field)
            .map(|mapping| mapping.kind)
            .unwrap_or(FieldKind::Keyword)
    }

    /// Encode a query value the way the field's values are indexed,
    /// without analysis.
    fn encode(&self, field: &str, value: &Value) -> Result<Vec<u8>> {
        let value = FieldValue::from_json(value).ok_or_else(|| {
            SarissaError::query_parse(format!("[{field}] expects a scalar value"))
        })?;
        let kind = match self.field_kind(field) {
            FieldKind::Text => FieldKind::Keyword,
            kind => kind,
        };
        codec::encode_value(kind, &value).map_err(|e| SarissaError::query_parse(e.to_string()))
    }

    fn parse_term(&self, body: &Value) -> Result<Box<dyn Query>> {
        let (field, params) = single_field(body, "term")?;
        let value = match params {
            Value::Object(options) => options.get("value").ok_or_else(|| {
                SarissaError::query_parse("[term] query requires a [value]")
            })?,
            other => other,
        };
        Ok(Box::new(TermQuery::new(field, self.encode(field, value)?)))
    }

    fn parse_terms(&self, body: &Value) -> Result<Box<dyn Query>> {
        let (field, params) = single_field(body, "terms")?;
        let values = params.as_array().ok_or_else(|| {
            SarissaError::query_parse("[terms] query requires an array of values")
        })?;

        let mut query = BooleanQuery::new();
        for value in values {
            query = query.should(Box::new(TermQuery::new(field, self.encode(field, value)?)));
        }
        Ok(Box::new(query))
    }

    fn parse_match(&self, body: &Value) -> Result<Box<dyn Query>> {
        let (field, params) = single_field(body, "match")?;
        let (text, operator) = match params {
            Value::Object(options) => {
                let text = options.get("query").ok_or_else(|| {
                    SarissaError::query_parse("[match] query requires a [query]")
                })?;
                let operator = options
                    .get("operator")
                    .and_then(Value::as_str)
                    .unwrap_or("or")
                    .to_ascii_lowercase();
                (text, operator)
            }
            other => (other, "or".to_string()),
        };
        let occur = match operator.as_str() {
            "or" => Occur::Should,
            "and" => Occur::Must,
            other => {
                return Err(SarissaError::query_parse(format!(
                    "[match] unknown operator [{other}]"
                )));
            }
        };

        if self.field_kind(field) != FieldKind::Text {
            return Ok(Box::new(TermQuery::new(field, self.encode(field, text)?)));
        }

        let text = FieldValue::from_json(text)
            .ok_or_else(|| SarissaError::query_parse("[match] query must be a scalar"))?
            .as_text();
        let analyzer = self.mapper.index_analyzer(&self.doc_type, field)?;
        let terms = analyzer.terms(&text)?;
        if terms.is_empty() {
            return Ok(Box::new(MatchNoneQuery::new()));
        }

        let mut query = BooleanQuery::new();
        for term in terms {
            query.add(Box::new(TermQuery::new(field, term.into_bytes())), occur);
        }
        Ok(Box::new(query))
    }

    fn parse_bool(&self, body: &Value) -> Result<Box<dyn Query>> {
        let options = as_object(body, "bool")?;
        let mut query = BooleanQuery::new();
        let mut positive = false;

        for (key, value) in options {
            let occur = match key.as_str() {
                "must" => Occur::Must,
                "should" => Occur::Should,
                "must_not" => Occur::MustNot,
                "filter" => Occur::Filter,
                "minimum_should_match" => {
                    query = query.with_minimum_should_match(parse_minimum(value)?);
                    continue;
                }
                "boost" => continue,
                other => {
                    return Err(SarissaError::query_parse(format!(
                        "[bool] query does not support [{other}]"
                    )));
                }
            };

            let clauses = match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                single => vec![single],
            };
            for clause in clauses {
                positive |= occur != Occur::MustNot;
                query.add(self.parse_query(clause)?, occur);
            }
        }

        if query.is_empty() {
            return Ok(Box::new(MatchAllQuery::new()));
        }
        if !positive {
            // Purely negative queries exclude from everything.
            query.add(Box::new(MatchAllQuery::new()), Occur::Filter);
        }
        Ok(Box::new(query))
    }

    fn parse_wildcard(&self, body: &Value, prefix: bool) -> Result<Box<dyn Query>> {
        let name = if prefix { "prefix" } else { "wildcard" };
        let (field, params) = single_field(body, name)?;
        let pattern = match params {
            Value::Object(options) => options
                .get("value")
                .or_else(|| options.get(name))
                .and_then(Value::as_str),
            other => other.as_str(),
        }
        .ok_or_else(|| SarissaError::query_parse(format!("[{name}] query requires a string value")))?;

        let query = if prefix {
            WildcardQuery::prefix(field, pattern)?
        } else {
            WildcardQuery::new(field, pattern)?
        };
        Ok(Box::new(query))
    }

    fn parse_exists(&self, body: &Value) -> Result<Box<dyn Query>> {
        let field = body
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| SarissaError::query_parse("[exists] query requires a [field]"))?;
        Ok(Box::new(WildcardQuery::new(field, "*")?))
    }
}

impl QueryParser for JsonQueryParser {
    fn parse(&self, source: &[u8]) -> Result<Box<dyn Query>> {
        let value: Value = serde_json::from_slice(source)
            .map_err(|e| SarissaError::query_parse(format!("failed to parse query: {e}")))?;
        self.parse_value(&value)
    }
}

fn as_object<'a>(value: &'a Value, name: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SarissaError::query_parse(format!("[{name}] must be an object")))
}

fn single_field<'a>(body: &'a Value, name: &str) -> Result<(&'a str, &'a Value)> {
    let object = as_object(body, name)?;
    let mut fields = object.iter().filter(|(key, _)| key.as_str() != "boost");
    match (fields.next(), fields.next()) {
        (Some((field, params)), None) => Ok((field.as_str(), params)),
        _ => Err(SarissaError::query_parse(format!(
            "[{name}] query must target exactly one field"
        ))),
    }
}

fn boost_of(body: &Value) -> Result<Option<f32>> {
    let boost = body.get("boost").or_else(|| {
        body.as_object()
            .and_then(|object| object.values().find_map(|params| params.get("boost")))
    });
    match boost {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(|b| Some(b as f32))
            .ok_or_else(|| SarissaError::query_parse("[boost] must be a number")),
    }
}

fn parse_minimum(value: &Value) -> Result<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.map(|n| n as usize).ok_or_else(|| {
        SarissaError::query_parse(format!("[minimum_should_match] must be a non-negative integer, got [{value}]"))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::AnalysisRegistry;
    use crate::error::ErrorKind;
    use crate::query::matcher::collect_all;
    use crate::schema::{FieldMapping, Schema, TypeMapping};
    use crate::test_support::index_documents;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new().with_type(
            "doc",
            TypeMapping::new()
                .field("body", FieldMapping::new(FieldKind::Text))
                .field("lang", FieldMapping::new(FieldKind::Keyword))
                .field("stars", FieldMapping::new(FieldKind::Integer))
                .field("spam", FieldMapping::new(FieldKind::Boolean)),
        )
    }

    fn parser() -> JsonQueryParser {
        let mapper = DocumentMapper::new(
            Arc::new(schema()),
            Arc::new(AnalysisRegistry::new().unwrap()),
        );
        JsonQueryParser::new(mapper, "doc")
    }

    fn matching(query: Value) -> Vec<u32> {
        let reader = index_documents(
            schema(),
            vec![
                json!({"body": "Cheap pills now", "lang": "en", "stars": 1, "spam": true}),
                json!({"body": "Meeting notes", "lang": "en", "stars": 4, "spam": false}),
                json!({"body": "Pastillas baratas", "lang": "es", "stars": 2}),
            ],
        );
        let query = parser().parse(query.to_string().as_bytes()).unwrap();
        let mut matcher = query.matcher(&reader).unwrap();
        collect_all(matcher.as_mut())
            .unwrap()
            .into_iter()
            .map(|(doc, _)| doc)
            .collect()
    }

    #[test]
    fn test_term_queries_are_encoded_by_field_kind() {
        assert_eq!(matching(json!({"term": {"lang": "en"}})), vec![0, 1]);
        assert_eq!(matching(json!({"term": {"stars": 4}})), vec![1]);
        assert_eq!(matching(json!({"term": {"stars": {"value": "2"}}})), vec![2]);
        assert_eq!(matching(json!({"term": {"spam": true}})), vec![0]);
        assert_eq!(matching(json!({"terms": {"stars": [1, 2]}})), vec![0, 2]);
    }

    #[test]
    fn test_match_analyzes_text() {
        assert_eq!(matching(json!({"match": {"body": "CHEAP notes"}})), vec![0, 1]);
        assert_eq!(
            matching(json!({"match": {"body": {"query": "cheap pills", "operator": "and"}}})),
            vec![0]
        );
        assert!(matching(json!({"match": {"body": "the"}})).is_empty());
    }

    #[test]
    fn test_bool_and_wrapper() {
        let query = json!({"query": {"bool": {
            "filter": {"term": {"lang": "en"}},
            "must_not": [{"term": {"stars": 1}}]
        }}});
        assert_eq!(matching(query), vec![1]);

        assert_eq!(
            matching(json!({"bool": {"must_not": {"term": {"lang": "en"}}}})),
            vec![2]
        );
        assert_eq!(matching(json!({"bool": {}})), vec![0, 1, 2]);
    }

    #[test]
    fn test_wildcard_prefix_exists() {
        assert_eq!(matching(json!({"wildcard": {"lang": "e?"}})), vec![0, 1, 2]);
        assert_eq!(matching(json!({"prefix": {"body": {"value": "past"}}})), vec![2]);
        assert_eq!(matching(json!({"exists": {"field": "spam"}})), vec![0, 1]);
        assert_eq!(matching(json!({"match_none": {}})), Vec::<u32>::new());
        assert_eq!(matching(json!({"match_all": {}})), vec![0, 1, 2]);
    }

    #[test]
    fn test_boost_is_applied() {
        let query = parser()
            .parse(br#"{"term": {"lang": {"value": "en", "boost": 2.5}}}"#)
            .unwrap();
        assert_eq!(query.boost(), 2.5);
    }

    #[test]
    fn test_errors() {
        let parser = parser();
        for source in [
            &br#"{"fuzzy": {"body": "x"}}"#[..],
            br#"{"term": {"a": "x", "b": "y"}}"#,
            br#"{}"#,
            br#"[1]"#,
            br#"not json"#,
            br#"{"term": {"stars": "many"}}"#,
        ] {
            let err = parser.parse(source).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::QueryParse, "{err}");
        }
    }
}
