//! Fixtures shared by unit tests.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::analysis::AnalysisRegistry;
use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::document::StoredDocument;
use crate::index::mapper::{DocumentMapper, ParsedDocument, ParsedField};
use crate::index::reader::{CompositeReader, LeafReader};
use crate::index::segment::SegmentWriter;
use crate::schema::Schema;

/// One segment where each `(field, text)` pair is a document whose single
/// field is analyzed with the standard analyzer.
pub fn leaf_reader(docs: &[(&str, &str)]) -> LeafReader {
    let analyzer = StandardAnalyzer::new().unwrap();
    let mut writer = SegmentWriter::new();
    for (i, (field, text)) in docs.iter().enumerate() {
        let terms = analyzer
            .terms(text)
            .unwrap()
            .into_iter()
            .map(String::into_bytes)
            .collect();
        writer.add_document(ParsedDocument {
            source: StoredDocument::new(i.to_string(), "doc", source(field, text)),
            fields: vec![ParsedField {
                name: field.to_string(),
                terms,
                term_vector: true,
                doc_value: Some(text.as_bytes().to_vec()),
            }],
        });
    }
    let segment = writer.flush().map(Arc::new).into_iter().collect();
    LeafReader::wrap(&CompositeReader::new(Arc::new(segment)))
}

/// Index `sources` as documents of type `doc` under `schema`, one segment.
pub fn index_documents(schema: Schema, sources: Vec<Value>) -> LeafReader {
    let mapper = mapper(schema);
    let mut writer = SegmentWriter::new();
    for (i, source) in sources.into_iter().enumerate() {
        let parsed = mapper
            .parse(StoredDocument::new(i.to_string(), "doc", source))
            .unwrap();
        writer.add_document(parsed);
    }
    let segment = writer.flush().map(Arc::new).into_iter().collect();
    LeafReader::wrap(&CompositeReader::new(Arc::new(segment)))
}

fn source(field: &str, text: &str) -> Value {
    let mut object = Map::new();
    object.insert(field.to_string(), Value::String(text.to_string()));
    Value::Object(object)
}

pub fn mapper(schema: Schema) -> DocumentMapper {
    DocumentMapper::new(Arc::new(schema), Arc::new(AnalysisRegistry::new().unwrap()))
}
