//! Applies a schema to a source document, producing the terms to index.

use std::sync::Arc;

use crate::analysis::{Analyzer, AnalysisRegistry};
use crate::codec;
use crate::document::StoredDocument;
use crate::error::{Result, SarissaError};
use crate::schema::{FieldKind, FieldMapping, Schema};

/// The indexed form of one field of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedField {
    pub name: String,
    /// Terms in token order, duplicates kept.
    pub terms: Vec<Vec<u8>>,
    /// Keep a per-document term vector for this field.
    pub term_vector: bool,
    /// Single value used for sorting and class lookups.
    pub doc_value: Option<Vec<u8>>,
}

/// A document ready to be added to a segment.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub source: StoredDocument,
    pub fields: Vec<ParsedField>,
}

/// Turns source documents into [`ParsedDocument`]s for one index.
#[derive(Clone)]
pub struct DocumentMapper {
    schema: Arc<Schema>,
    analysis: Arc<AnalysisRegistry>,
}

impl DocumentMapper {
    pub fn new(schema: Arc<Schema>, analysis: Arc<AnalysisRegistry>) -> Self {
        DocumentMapper { schema, analysis }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The analyzer that indexes `field`: the field's own, else the index
    /// default, else the registry default.
    pub fn index_analyzer(&self, doc_type: &str, field: &str) -> Result<Arc<dyn Analyzer>> {
        match self
            .schema
            .field_analyzer(doc_type, field)
            .or(self.schema.default_analyzer.as_deref())
        {
            Some(name) => self.analysis.analyzer(name),
            None => self.analysis.default_analyzer(),
        }
    }

    /// Map `document`. Unmapped fields are kept in the source only.
    pub fn parse(&self, document: StoredDocument) -> Result<ParsedDocument> {
        if document.id.is_empty() {
            return Err(SarissaError::invalid_argument("document id is missing"));
        }

        let mut fields = Vec::new();
        for (name, values) in document.flatten()? {
            let Some(mapping) = self.schema.resolve_field(&document.doc_type, &name) else {
                continue;
            };
            if !mapping.index || mapping.kind == FieldKind::Binary {
                continue;
            }
            let field = self
                .parse_field(&document.doc_type, &name, mapping, &values)
                .map_err(|e| {
                    SarissaError::invalid_argument(format!(
                        "failed to parse field [{name}] of document [{}]: {e}",
                        document.id
                    ))
                })?;
            fields.push(field);
        }

        Ok(ParsedDocument {
            source: document,
            fields,
        })
    }

    fn parse_field(
        &self,
        doc_type: &str,
        name: &str,
        mapping: &FieldMapping,
        values: &[crate::document::FieldValue],
    ) -> Result<ParsedField> {
        let mut terms = Vec::new();
        let doc_value;

        if mapping.kind.is_analyzed() {
            let analyzer = self.index_analyzer(doc_type, name)?;
            for value in values {
                terms.extend(
                    analyzer
                        .terms(&value.as_text())?
                        .into_iter()
                        .map(String::into_bytes),
                );
            }
            doc_value = values.first().map(|value| value.as_text().into_bytes());
        } else {
            for value in values {
                terms.push(codec::encode_value(mapping.kind, value)?);
            }
            doc_value = terms.first().cloned();
        }

        Ok(ParsedField {
            name: name.to_string(),
            terms,
            term_vector: mapping.kind.is_analyzed(),
            doc_value,
        })
    }
}
