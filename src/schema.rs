//! Index mappings: declared field types, analyzers and index settings.
//!
//! Mappings are read from an Elasticsearch-style document:
//!
//! ```
//! use sarissa_classify::schema::{FieldKind, IndexDefinition};
//!
//! let definition: IndexDefinition = serde_json::from_str(r#"{
//!     "settings": { "number_of_shards": 2, "number_of_replicas": 1 },
//!     "mappings": {
//!         "post": {
//!             "properties": {
//!                 "body":  { "type": "text", "analyzer": "standard" },
//!                 "label": { "type": "keyword" }
//!             }
//!         }
//!     }
//! }"#).unwrap();
//!
//! let schema = definition.schema();
//! assert_eq!(schema.field_kind("post", "label").unwrap(), FieldKind::Keyword);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SarissaError};

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[serde(alias = "string")]
    Text,
    Keyword,
    Boolean,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Date,
    Binary,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Keyword => "keyword",
            FieldKind::Boolean => "boolean",
            FieldKind::Short => "short",
            FieldKind::Integer => "integer",
            FieldKind::Long => "long",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::Date => "date",
            FieldKind::Binary => "binary",
        }
    }

    /// Whether values are run through an analyzer before indexing.
    pub fn is_analyzed(&self) -> bool {
        matches!(self, FieldKind::Text)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Short
                | FieldKind::Integer
                | FieldKind::Long
                | FieldKind::Float
                | FieldKind::Double
                | FieldKind::Date
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Mapping of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub kind: FieldKind,

    /// Analyzer for text fields; the index default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,

    /// Whether the field is searchable.
    #[serde(default = "default_true")]
    pub index: bool,

    #[serde(default)]
    pub store: bool,
}

impl FieldMapping {
    pub fn new(kind: FieldKind) -> Self {
        FieldMapping {
            kind,
            analyzer: None,
            index: true,
            store: false,
        }
    }

    pub fn with_analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }
}

/// The fields of one document type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMapping {
    #[serde(default)]
    pub properties: BTreeMap<String, FieldMapping>,
}

impl TypeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<S: Into<String>>(mut self, name: S, mapping: FieldMapping) -> Self {
        self.properties.insert(name.into(), mapping);
        self
    }
}

/// All type mappings of an index plus its default analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub mappings: BTreeMap<String, TypeMapping>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_analyzer: Option<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type<S: Into<String>>(mut self, name: S, mapping: TypeMapping) -> Self {
        self.mappings.insert(name.into(), mapping);
        self
    }

    pub fn with_default_analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.default_analyzer = Some(analyzer.into());
        self
    }

    /// Find the mapping of `field`, preferring the given document type and
    /// falling back to any other type that maps it.
    pub fn resolve_field(&self, doc_type: &str, field: &str) -> Option<&FieldMapping> {
        self.mappings
            .get(doc_type)
            .and_then(|mapping| mapping.properties.get(field))
            .or_else(|| {
                self.mappings
                    .values()
                    .find_map(|mapping| mapping.properties.get(field))
            })
    }

    /// The declared kind of `field`, failing with `SchemaMismatch` when unmapped.
    pub fn field_kind(&self, doc_type: &str, field: &str) -> Result<FieldKind> {
        self.resolve_field(doc_type, field)
            .map(|mapping| mapping.kind)
            .ok_or_else(|| {
                SarissaError::schema_mismatch(format!("no mapping found for field [{field}]"))
            })
    }

    /// The analyzer configured on `field`, if any.
    pub fn field_analyzer(&self, doc_type: &str, field: &str) -> Option<&str> {
        self.resolve_field(doc_type, field)
            .and_then(|mapping| mapping.analyzer.as_deref())
    }

    pub fn has_type(&self, doc_type: &str) -> bool {
        self.mappings.contains_key(doc_type)
    }
}

fn default_shards() -> u32 {
    1
}

/// Shard layout and analysis defaults of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default = "default_shards")]
    pub number_of_shards: u32,

    #[serde(default)]
    pub number_of_replicas: u32,

    /// Default analyzer for text fields without an explicit one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            number_of_shards: default_shards(),
            number_of_replicas: 0,
            analyzer: None,
        }
    }
}

/// An index creation document: settings plus per-type mappings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    #[serde(default)]
    pub settings: IndexSettings,

    #[serde(default)]
    pub mappings: BTreeMap<String, TypeMapping>,
}

impl IndexDefinition {
    /// Parse a definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: IndexDefinition = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn validate(&self) -> Result<()> {
        if self.settings.number_of_shards == 0 {
            return Err(SarissaError::invalid_argument(
                "index must have at least one shard",
            ));
        }
        Ok(())
    }

    pub fn schema(&self) -> Schema {
        Schema {
            mappings: self.mappings.clone(),
            default_analyzer: self.settings.analyzer.clone(),
        }
    }
}
