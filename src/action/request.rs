//! The classify request: builder, body parsing, validation and wire form.

use serde_json::Value;

use crate::classification::ModelType;
use crate::error::{Result, SarissaError, ValidationErrors};
use crate::settings::Settings;
use crate::transport::{StreamInput, StreamOutput};

/// Number of classes returned when a request does not say.
pub const DEFAULT_TOP_N: usize = 3;

/// Largest `top_n` a request may carry.
pub const MAX_TOP_N: usize = i32::MAX as usize;

/// A request to train a classifier on every shard of `train_index` and
/// evaluate it on `eval_on`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyRequest {
    text_fields: Vec<String>,
    class_field: Option<String>,
    eval_on: Option<String>,
    train_index: Option<String>,
    train_type: Option<String>,
    train_query: Option<Vec<u8>>,
    analyzer: Option<String>,
    model_type: Option<ModelType>,
    model_settings: Settings,
    routing: Vec<String>,
    top_n: usize,
    now_in_millis: i64,
}

impl Default for ClassifyRequest {
    fn default() -> Self {
        ClassifyRequest {
            text_fields: Vec::new(),
            class_field: None,
            eval_on: None,
            train_index: None,
            train_type: None,
            train_query: None,
            analyzer: None,
            model_type: None,
            model_settings: Settings::new(),
            routing: Vec::new(),
            top_n: DEFAULT_TOP_N,
            now_in_millis: 0,
        }
    }
}

impl ClassifyRequest {
    pub fn new<I: Into<String>, T: Into<String>>(train_index: I, train_type: T) -> Self {
        ClassifyRequest {
            train_index: Some(train_index.into()),
            train_type: Some(train_type.into()),
            ..Default::default()
        }
    }

    pub fn builder<I: Into<String>, T: Into<String>>(
        train_index: I,
        train_type: T,
    ) -> ClassifyRequestBuilder {
        ClassifyRequestBuilder {
            request: ClassifyRequest::new(train_index, train_type),
        }
    }

    pub fn text_fields(&self) -> &[String] {
        &self.text_fields
    }

    pub fn set_text_fields<S: Into<String>>(&mut self, fields: Vec<S>) {
        self.text_fields = fields.into_iter().map(Into::into).collect();
    }

    pub fn class_field(&self) -> &str {
        self.class_field.as_deref().unwrap_or_default()
    }

    pub fn set_class_field<S: Into<String>>(&mut self, class_field: S) {
        self.class_field = Some(class_field.into());
    }

    pub fn eval_on(&self) -> &str {
        self.eval_on.as_deref().unwrap_or_default()
    }

    pub fn set_eval_on<S: Into<String>>(&mut self, text: S) {
        self.eval_on = Some(text.into());
    }

    pub fn train_index(&self) -> &str {
        self.train_index.as_deref().unwrap_or_default()
    }

    pub fn set_train_index<S: Into<String>>(&mut self, index: S) {
        self.train_index = Some(index.into());
    }

    pub fn train_type(&self) -> &str {
        self.train_type.as_deref().unwrap_or_default()
    }

    pub fn set_train_type<S: Into<String>>(&mut self, doc_type: S) {
        self.train_type = Some(doc_type.into());
    }

    /// Serialized query selecting the training documents.
    pub fn train_query(&self) -> Option<&[u8]> {
        self.train_query.as_deref()
    }

    pub fn set_train_query(&mut self, query: Vec<u8>) {
        self.train_query = if query.is_empty() { None } else { Some(query) };
    }

    pub fn set_train_query_json(&mut self, query: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(query).map_err(|e| {
            SarissaError::invalid_argument(format!("failed to generate [{query}]: {e}"))
        })?;
        self.set_train_query(bytes);
        Ok(())
    }

    pub fn analyzer(&self) -> Option<&str> {
        self.analyzer.as_deref()
    }

    pub fn set_analyzer<S: Into<String>>(&mut self, analyzer: S) {
        self.analyzer = Some(analyzer.into());
    }

    pub fn model_type(&self) -> Option<ModelType> {
        self.model_type
    }

    pub fn set_model_type(&mut self, model_type: ModelType) {
        self.model_type = Some(model_type);
    }

    pub fn model_settings(&self) -> &Settings {
        &self.model_settings
    }

    pub fn set_model_settings(&mut self, settings: Settings) {
        self.model_settings = settings;
    }

    pub fn routing(&self) -> &[String] {
        &self.routing
    }

    /// Comma separated routing values.
    pub fn set_routing(&mut self, routing: &str) {
        self.routing = routing
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
            .collect();
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn set_top_n(&mut self, top_n: usize) {
        self.top_n = top_n;
    }

    pub fn now_in_millis(&self) -> i64 {
        self.now_in_millis
    }

    pub(crate) fn set_now_in_millis(&mut self, now: i64) {
        self.now_in_millis = now;
    }

    /// Apply a JSON or YAML request body.
    pub fn source(&mut self, body: &[u8]) -> Result<()> {
        let value = parse_body(body)?;
        self.source_value(&value)
    }

    /// Apply an already parsed request body.
    pub fn source_value(&mut self, body: &Value) -> Result<()> {
        let object = body.as_object().ok_or_else(|| {
            SarissaError::invalid_argument("failed to parse classify source, expected an object")
        })?;

        for (name, value) in object {
            match name.as_str() {
                "field" => self.text_fields = scalar_param(name, value)?.into_iter().collect(),
                "fields" => {
                    let fields = value
                        .as_array()
                        .and_then(|items| {
                            items
                                .iter()
                                .map(|item| item.as_str().map(String::from))
                                .collect::<Option<Vec<_>>>()
                        })
                        .ok_or_else(|| {
                            SarissaError::invalid_argument(
                                "malformed fields, should be an array of strings",
                            )
                        })?;
                    self.text_fields = fields;
                }
                "class" => self.class_field = scalar_param(name, value)?,
                "text" => self.eval_on = scalar_param(name, value)?,
                "query" => {
                    if !value.is_object() {
                        return Err(SarissaError::invalid_argument(
                            "malformed query, should include an inner object",
                        ));
                    }
                    self.set_train_query_json(value)?;
                }
                "analyzer" => self.analyzer = scalar_param(name, value)?,
                "model" => {
                    self.model_type = scalar_param(name, value)?
                        .map(|model| model.parse::<ModelType>())
                        .transpose()?;
                }
                "settings" => {
                    if !value.is_object() {
                        return Err(SarissaError::invalid_argument(
                            "malformed model settings section, should include an inner object",
                        ));
                    }
                    self.model_settings = Settings::from_json(value)?;
                }
                "top_n" => {
                    let top_n = value
                        .as_u64()
                        .filter(|n| (1..=MAX_TOP_N as u64).contains(n))
                        .ok_or_else(|| {
                            SarissaError::invalid_argument(format!(
                                "malformed top_n [{value}], should be a positive 32-bit integer"
                            ))
                        })?;
                    self.top_n = top_n as usize;
                }
                other => {
                    return Err(SarissaError::invalid_argument(format!(
                        "unknown parameter [{other}]"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every problem with this request; empty when it can be executed.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.text_fields.is_empty() || self.text_fields.iter().any(String::is_empty) {
            errors.add("name of the field used to compare documents is either missing or empty");
        }
        if self.class_field.as_deref().is_none_or(str::is_empty) {
            errors.add("name of the field containing the class assigned to documents is missing");
        }
        if self.train_index.as_deref().is_none_or(str::is_empty) {
            errors.add("index on which to train the classifier is either missing or empty");
        }
        if self.train_type.is_none() {
            errors.add("type on which to train the classifier is missing");
        }
        if self.eval_on.is_none() {
            errors.add("text to be evaluated is missing");
        }
        if !(1..=MAX_TOP_N).contains(&self.top_n) {
            errors.add(format!(
                "number of classes to return must be between 1 and {MAX_TOP_N}, got [{}]",
                self.top_n
            ));
        }
        errors
    }

    pub fn write_to(&self, out: &mut StreamOutput) {
        out.write_string_array(&self.text_fields);
        out.write_string(self.class_field());
        out.write_string(self.eval_on());
        out.write_string(self.train_index());
        out.write_string(self.train_type());
        out.write_bytes(self.train_query().unwrap_or_default());
        out.write_optional_string(self.analyzer());
        out.write_optional_string(self.model_type.map(|model| model.as_str()));
        self.model_settings.write_to(out);
        out.write_vint(self.top_n.min(MAX_TOP_N) as u32);
    }

    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let text_fields = input.read_string_array()?;
        let class_field = input.read_string()?;
        let eval_on = input.read_string()?;
        let train_index = input.read_string()?;
        let train_type = input.read_string()?;
        let train_query = input.read_bytes()?;
        let analyzer = input.read_optional_string()?;
        let model_type = input
            .read_optional_string()?
            .map(|name| name.parse::<ModelType>())
            .transpose()?;
        let model_settings = Settings::read_from(input)?;
        let top_n = input.read_vint()? as usize;

        Ok(ClassifyRequest {
            text_fields,
            class_field: Some(class_field),
            eval_on: Some(eval_on),
            train_index: Some(train_index),
            train_type: Some(train_type),
            train_query: if train_query.is_empty() {
                None
            } else {
                Some(train_query)
            },
            analyzer,
            model_type,
            model_settings,
            routing: Vec::new(),
            top_n,
            now_in_millis: 0,
        })
    }
}

/// Fluent construction of a [`ClassifyRequest`].
#[derive(Debug, Clone)]
pub struct ClassifyRequestBuilder {
    request: ClassifyRequest,
}

impl ClassifyRequestBuilder {
    pub fn text_fields<S: Into<String>>(mut self, fields: Vec<S>) -> Self {
        self.request.set_text_fields(fields);
        self
    }

    pub fn text_field<S: Into<String>>(self, field: S) -> Self {
        self.text_fields(vec![field.into()])
    }

    pub fn class_field<S: Into<String>>(mut self, class_field: S) -> Self {
        self.request.set_class_field(class_field);
        self
    }

    pub fn eval_on<S: Into<String>>(mut self, text: S) -> Self {
        self.request.set_eval_on(text);
        self
    }

    pub fn train_query(mut self, query: Value) -> Result<Self> {
        self.request.set_train_query_json(&query)?;
        Ok(self)
    }

    pub fn analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.request.set_analyzer(analyzer);
        self
    }

    pub fn model_type(mut self, model_type: ModelType) -> Self {
        self.request.set_model_type(model_type);
        self
    }

    pub fn model_settings(mut self, settings: Settings) -> Self {
        self.request.set_model_settings(settings);
        self
    }

    pub fn routing(mut self, routing: &str) -> Self {
        self.request.set_routing(routing);
        self
    }

    pub fn top_n(mut self, top_n: usize) -> Self {
        self.request.set_top_n(top_n);
        self
    }

    pub fn source(mut self, body: &[u8]) -> Result<Self> {
        self.request.source(body)?;
        Ok(self)
    }

    pub fn build(self) -> ClassifyRequest {
        self.request
    }
}

/// Parse a JSON body, or YAML when it does not look like JSON.
pub fn parse_body(body: &[u8]) -> Result<Value> {
    let first = body.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'{') {
        serde_json::from_slice(body).map_err(|e| {
            SarissaError::invalid_argument(format!("failed to parse classify source: {e}"))
        })
    } else {
        serde_yaml::from_slice(body).map_err(|e| {
            SarissaError::invalid_argument(format!("failed to parse classify source: {e}"))
        })
    }
}

/// A string-valued body parameter; `null` counts as absent.
fn scalar_param(name: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(SarissaError::invalid_argument(format!(
            "malformed {name}, should be a string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parsed(body: &str) -> Result<ClassifyRequest> {
        let mut request = ClassifyRequest::new("news", "doc");
        request.source(body.as_bytes())?;
        Ok(request)
    }

    #[test]
    fn test_source_json() {
        let request = parsed(
            r#"{"fields": ["title", "body"], "class": "topic", "text": "cheap pills",
                "query": {"term": {"lang": "en"}}, "model": "knn",
                "settings": {"k": 5}, "top_n": 2}"#,
        )
        .unwrap();
        assert_eq!(request.text_fields(), ["title", "body"]);
        assert_eq!(request.class_field(), "topic");
        assert_eq!(request.eval_on(), "cheap pills");
        assert_eq!(request.model_type(), Some(ModelType::Knn));
        assert_eq!(request.model_settings().get("k"), Some("5"));
        assert_eq!(request.top_n(), 2);
        let query: Value = serde_json::from_slice(request.train_query().unwrap()).unwrap();
        assert_eq!(query["term"]["lang"], "en");
        assert!(request.validate().is_empty());
    }

    #[test]
    fn test_source_yaml() {
        let request = parsed("field: body\nclass: spam\ntext: hello there\nmodel: boolean_perceptron\nsettings:\n  threshold: 2.5\n").unwrap();
        assert_eq!(request.text_fields(), ["body"]);
        assert_eq!(request.model_type(), Some(ModelType::BooleanPerceptron));
        assert_eq!(
            request.model_settings().get_as_f64("threshold").unwrap(),
            Some(2.5)
        );
        assert_eq!(request.top_n(), DEFAULT_TOP_N);
    }

    #[test]
    fn test_source_errors() {
        let cases = [
            (r#"{"fields": "body"}"#, "malformed fields, should be an array of strings"),
            (r#"{"fields": [1, 2]}"#, "malformed fields, should be an array of strings"),
            (r#"{"query": "x"}"#, "malformed query, should include an inner object"),
            (
                r#"{"settings": 3}"#,
                "malformed model settings section, should include an inner object",
            ),
            (r#"{"colour": "red"}"#, "unknown parameter [colour]"),
            (r#"{"model": "svm"}"#, "unknown model type [svm]"),
        ];
        for (body, message) in cases {
            let err = parsed(body).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{body}");
            assert!(err.to_string().contains(message), "{err} for {body}");
        }
    }

    #[test]
    fn test_top_n_must_be_a_positive_int() {
        for top_n in ["0", "-1", "2.5", "\"two\"", "2147483648"] {
            let body = format!(r#"{{"field": "body", "class": "topic", "text": "x", "top_n": {top_n}}}"#);
            let err = parsed(&body).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{body}");
            assert!(err.to_string().contains("should be a positive 32-bit integer"), "{err}");
        }
        let request = parsed(r#"{"field": "body", "class": "topic", "text": "x", "top_n": 2147483647}"#).unwrap();
        assert_eq!(request.top_n(), MAX_TOP_N);
        assert!(request.validate().is_empty());

        let mut request = parsed(r#"{"field": "body", "class": "topic", "text": "x"}"#).unwrap();
        request.set_top_n(0);
        assert_eq!(
            request.validate().errors(),
            ["number of classes to return must be between 1 and 2147483647, got [0]"]
        );
    }

    #[test]
    fn test_null_and_structured_scalars() {
        let request = parsed(r#"{"field": "body", "class": "topic", "text": null, "analyzer": null}"#).unwrap();
        assert_eq!(request.eval_on, None);
        assert_eq!(request.analyzer(), None);
        assert_eq!(request.validate().errors(), ["text to be evaluated is missing"]);

        let request = parsed(r#"{"field": null, "class": null, "text": "x", "model": null}"#).unwrap();
        assert!(request.text_fields().is_empty());
        assert_eq!(request.model_type(), None);
        assert_eq!(request.validate().errors().len(), 2);

        for (key, value) in [("field", "[\"a\"]"), ("class", "{}"), ("text", "[]"), ("analyzer", "{\"a\": 1}")] {
            let body = format!(r#"{{"{key}": {value}}}"#);
            let err = parsed(&body).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{body}");
            assert_eq!(err.to_string(), format!("Invalid argument: malformed {key}, should be a string"));
        }
    }

    #[test]
    fn test_empty_train_index_is_invalid() {
        let request = ClassifyRequest::builder("", "doc")
            .text_field("body")
            .class_field("topic")
            .eval_on("x")
            .build();
        assert_eq!(
            request.validate().errors(),
            ["index on which to train the classifier is either missing or empty"]
        );
    }

    #[test]
    fn test_validate_reports_everything() {
        let errors = ClassifyRequest::default().validate();
        assert_eq!(
            errors.errors(),
            [
                "name of the field used to compare documents is either missing or empty",
                "name of the field containing the class assigned to documents is missing",
                "index on which to train the classifier is either missing or empty",
                "type on which to train the classifier is missing",
                "text to be evaluated is missing",
            ]
        );

        let request = ClassifyRequest::builder("news", "doc")
            .text_field("")
            .class_field("topic")
            .eval_on("x")
            .build();
        assert_eq!(request.validate().errors().len(), 1);
        assert_eq!(request.validate(), request.validate());
    }

    #[test]
    fn test_wire_form() {
        let request = ClassifyRequest::builder("news", "doc")
            .text_fields(vec!["title", "body"])
            .class_field("topic")
            .eval_on("cheap pills")
            .train_query(serde_json::json!({"match_all": {}}))
            .unwrap()
            .analyzer("simple")
            .model_type(ModelType::CachingNaiveBayes)
            .model_settings(Settings::builder().put("k", 4).build())
            .top_n(7)
            .build();

        let mut out = StreamOutput::new();
        request.write_to(&mut out);
        let bytes = out.into_bytes();
        let mut input = StreamInput::new(&bytes);
        assert_eq!(ClassifyRequest::read_from(&mut input).unwrap(), request);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_routing_is_split() {
        let request = ClassifyRequest::builder("news", "doc")
            .routing("a, b,,c")
            .build();
        assert_eq!(request.routing(), ["a", "b", "c"]);
    }
}
