//! Command implementations for the sarissa-classify CLI.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};
use serde_json::{Value, json};

use crate::action::{ClassifyConfig, ClassifyRequest, ClassifyResponse};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::document::StoredDocument;
use crate::error::{Result, SarissaError};
use crate::node::LocalCluster;
use crate::schema::IndexDefinition;

/// Execute a CLI command.
pub fn execute_command(args: SarissaArgs) -> Result<()> {
    match &args.command {
        Command::Classify(classify_args) => run_classify(classify_args, &args),
        Command::Validate(validate_args) => run_validate(validate_args, &args),
    }
}

fn run_classify(args: &ClassifyArgs, cli_args: &SarissaArgs) -> Result<()> {
    let response = classify(args)?;
    output_classify_response(&response, cli_args)
}

fn run_validate(args: &ValidateArgs, cli_args: &SarissaArgs) -> Result<()> {
    let errors = validate(args)?;
    output_validation(&errors, cli_args)?;
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SarissaError::invalid_argument(format!(
            "request has {} validation errors",
            errors.len()
        )))
    }
}

/// Build a local cluster from the given files and run the request against it.
pub fn classify(args: &ClassifyArgs) -> Result<ClassifyResponse> {
    let config = match &args.config {
        Some(path) => ClassifyConfig::from_file(path)?,
        None => ClassifyConfig::default(),
    };

    let mut definition = IndexDefinition::from_json(&fs::read_to_string(&args.mapping)?)?;
    if let Some(shards) = args.shards {
        definition.settings.number_of_shards = shards;
    }
    if let Some(replicas) = args.replicas {
        definition.settings.number_of_replicas = replicas;
    }

    let mut request = ClassifyRequest::new(args.index.as_str(), args.doc_type.as_str());
    request.set_top_n(config.default_top_n);
    request.source(&fs::read(&args.request)?)?;
    if let Some(top_n) = args.top_n {
        request.set_top_n(top_n);
    }
    if let Some(routing) = &args.routing {
        request.set_routing(routing);
    }

    let cluster = LocalCluster::builder()
        .nodes(args.nodes)
        .config(config)
        .build()?;
    cluster.create_index(&args.index, definition)?;
    let loaded = load_documents(&cluster, &args.index, &args.doc_type, &args.documents)?;
    cluster.refresh(&args.index)?;
    info!("indexed {loaded} documents into [{}]", args.index);

    cluster.classify(request)
}

/// Parse a request body and collect its validation errors.
pub fn validate(args: &ValidateArgs) -> Result<Vec<String>> {
    let mut request = ClassifyRequest::new(args.index.as_str(), args.doc_type.as_str());
    request.source(&fs::read(&args.request)?)?;
    Ok(request.validate().errors().to_vec())
}

/// Index every line of a JSONL file. A line is either a bare source object
/// or an envelope with `_id`, `_routing` and `_source`.
fn load_documents(
    cluster: &LocalCluster,
    index: &str,
    doc_type: &str,
    path: &Path,
) -> Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut loaded = 0;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).map_err(|e| {
            SarissaError::invalid_argument(format!(
                "failed to parse document on line {}: {e}",
                line_num + 1
            ))
        })?;
        let document = to_document(value, doc_type, line_num + 1);
        debug!("indexing document [{}]", document.id);
        cluster.index(index, document)?;
        loaded += 1;
    }

    Ok(loaded)
}

fn to_document(value: Value, doc_type: &str, line: usize) -> StoredDocument {
    match value {
        Value::Object(mut envelope) if envelope.contains_key("_source") => {
            let id = match envelope.remove("_id") {
                Some(Value::String(id)) => id,
                Some(other) => other.to_string(),
                None => line.to_string(),
            };
            let source = envelope.remove("_source").unwrap_or_else(|| json!({}));
            let document = StoredDocument::new(id, doc_type, source);
            match envelope.remove("_routing") {
                Some(Value::String(routing)) => document.with_routing(routing),
                _ => document,
            }
        }
        source => StoredDocument::new(line.to_string(), doc_type, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ClassValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn args(mapping: &NamedTempFile, documents: &NamedTempFile, request: &NamedTempFile) -> ClassifyArgs {
        ClassifyArgs {
            mapping: mapping.path().to_path_buf(),
            documents: documents.path().to_path_buf(),
            request: request.path().to_path_buf(),
            index: "mail".to_string(),
            doc_type: "doc".to_string(),
            nodes: 2,
            shards: Some(2),
            replicas: None,
            config: None,
            top_n: None,
            routing: None,
        }
    }

    #[test]
    fn test_classify_from_files() {
        let mapping = file(
            r#"{"settings": {"number_of_shards": 1},
                "mappings": {"doc": {"properties": {
                    "body": {"type": "text"}, "label": {"type": "keyword"}}}}}"#,
        );
        let documents = file(concat!(
            "{\"body\": \"cheap pills online\", \"label\": \"spam\"}\n",
            "{\"_id\": \"m2\", \"_routing\": \"a\", \"_source\": {\"body\": \"cheap pills offer\", \"label\": \"spam\"}}\n",
            "\n",
            "{\"body\": \"team meeting notes\", \"label\": \"ham\"}\n",
            "{\"body\": \"meeting agenda notes\", \"label\": \"ham\"}\n",
        ));
        let request = file("field: body\nclass: label\ntext: cheap pills\ntop_n: 1\n");

        let mut args = args(&mapping, &documents, &request);
        args.shards = Some(1);
        let response = classify(&args).unwrap();
        assert_eq!(response.total_shards(), 1);
        assert_eq!(response.failed_shards(), 0);
        let top = response.result().top(response.top_n());
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].assigned_class, ClassValue::from("spam"));
    }

    #[test]
    fn test_bad_document_line() {
        let mapping = file(r#"{"mappings": {"doc": {"properties": {"body": {"type": "text"}}}}}"#);
        let documents = file("{not json}\n");
        let request = file(r#"{"field": "body", "class": "label", "text": "x"}"#);
        let err = classify(&args(&mapping, &documents, &request)).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_validate_lists_problems() {
        let request = file(r#"{"field": "body"}"#);
        let errors = validate(&ValidateArgs {
            request: request.path().to_path_buf(),
            index: "mail".to_string(),
            doc_type: "doc".to_string(),
        })
        .unwrap();
        assert_eq!(
            errors,
            [
                "name of the field containing the class assigned to documents is missing",
                "text to be evaluated is missing",
            ]
        );
    }

    #[test]
    fn test_envelope_documents() {
        let document = to_document(
            json!({"_id": 7, "_routing": "r", "_source": {"body": "x"}}),
            "doc",
            3,
        );
        assert_eq!(document.id, "7");
        assert_eq!(document.routing_key(), "r");

        let document = to_document(json!({"body": "x"}), "doc", 3);
        assert_eq!(document.id, "3");
    }
}
