//! Immutable in-memory segments and the writer that builds them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use crate::document::StoredDocument;
use crate::index::mapper::ParsedDocument;

/// Document identifier, local to a segment or rebased in a leaf reader.
pub type DocId = u32;

/// Sentinel returned by exhausted matchers.
pub const NO_MORE_DOCS: DocId = DocId::MAX;

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(0);

/// One entry of a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc: DocId,
    pub freq: u32,
}

/// Per-term statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermInfo {
    pub doc_freq: u32,
    pub total_term_freq: u64,
}

/// Per-field statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStats {
    /// Documents with at least one term in the field.
    pub doc_count: u32,
    /// Number of (term, document) pairs.
    pub sum_doc_freq: u64,
    /// Number of term occurrences.
    pub sum_total_term_freq: u64,
}

impl FieldStats {
    pub fn merge(&mut self, other: &FieldStats) {
        self.doc_count += other.doc_count;
        self.sum_doc_freq += other.sum_doc_freq;
        self.sum_total_term_freq += other.sum_total_term_freq;
    }
}

/// The inverted index of one field within a segment.
#[derive(Debug, Default)]
pub struct FieldIndex {
    terms: BTreeMap<Vec<u8>, Vec<Posting>>,
    stats: FieldStats,
    lengths: Vec<u32>,
    term_vectors: Option<Vec<Option<Vec<(Vec<u8>, u32)>>>>,
}

impl FieldIndex {
    pub fn stats(&self) -> FieldStats {
        self.stats
    }

    pub fn postings(&self, term: &[u8]) -> Option<&[Posting]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    /// Terms in byte order with their statistics.
    pub fn terms(&self) -> impl Iterator<Item = (&[u8], TermInfo)> + '_ {
        self.terms.iter().map(|(term, postings)| {
            (
                term.as_slice(),
                TermInfo {
                    doc_freq: postings.len() as u32,
                    total_term_freq: postings.iter().map(|p| u64::from(p.freq)).sum(),
                },
            )
        })
    }

    /// Number of terms the document has in this field.
    pub fn length(&self, doc: DocId) -> u32 {
        self.lengths.get(doc as usize).copied().unwrap_or(0)
    }

    pub fn term_vector(&self, doc: DocId) -> Option<&[(Vec<u8>, u32)]> {
        self.term_vectors
            .as_ref()
            .and_then(|vectors| vectors.get(doc as usize))
            .and_then(|vector| vector.as_deref())
    }
}

/// An immutable batch of indexed documents.
#[derive(Debug)]
pub struct Segment {
    id: u64,
    fields: AHashMap<String, FieldIndex>,
    doc_values: AHashMap<String, Vec<Option<Vec<u8>>>>,
    documents: Vec<StoredDocument>,
}

impl Segment {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn max_doc(&self) -> u32 {
        self.documents.len() as u32
    }

    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.fields.get(name)
    }

    pub fn doc_value(&self, field: &str, doc: DocId) -> Option<&[u8]> {
        self.doc_values
            .get(field)
            .and_then(|values| values.get(doc as usize))
            .and_then(|value| value.as_deref())
    }

    pub fn document(&self, doc: DocId) -> Option<&StoredDocument> {
        self.documents.get(doc as usize)
    }
}

/// Buffers parsed documents until they are flushed into a [`Segment`].
#[derive(Debug, Default)]
pub struct SegmentWriter {
    pending: Vec<ParsedDocument>,
}

impl SegmentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, document: ParsedDocument) {
        self.pending.push(document);
    }

    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Build a segment from everything buffered, or `None` if nothing is.
    pub fn flush(&mut self) -> Option<Segment> {
        if self.pending.is_empty() {
            return None;
        }

        let documents = std::mem::take(&mut self.pending);
        let max_doc = documents.len();
        let mut fields: AHashMap<String, FieldIndex> = AHashMap::new();
        let mut doc_values: AHashMap<String, Vec<Option<Vec<u8>>>> = AHashMap::new();
        let mut sources = Vec::with_capacity(max_doc);

        for (doc, parsed) in documents.into_iter().enumerate() {
            let doc = doc as DocId;
            for field in parsed.fields {
                let index = fields.entry(field.name.clone()).or_insert_with(|| FieldIndex {
                    lengths: vec![0; max_doc],
                    term_vectors: None,
                    ..FieldIndex::default()
                });

                let mut freqs: BTreeMap<Vec<u8>, u32> = BTreeMap::new();
                for term in &field.terms {
                    *freqs.entry(term.clone()).or_insert(0) += 1;
                }

                index.lengths[doc as usize] = field.terms.len() as u32;
                if !freqs.is_empty() {
                    index.stats.doc_count += 1;
                    index.stats.sum_doc_freq += freqs.len() as u64;
                    index.stats.sum_total_term_freq += field.terms.len() as u64;
                }
                for (term, freq) in &freqs {
                    index
                        .terms
                        .entry(term.clone())
                        .or_default()
                        .push(Posting { doc, freq: *freq });
                }
                if field.term_vector {
                    let vectors = index.term_vectors.get_or_insert_with(|| vec![None; max_doc]);
                    vectors[doc as usize] = Some(freqs.into_iter().collect());
                }

                if let Some(value) = field.doc_value {
                    doc_values
                        .entry(field.name)
                        .or_insert_with(|| vec![None; max_doc])[doc as usize] = Some(value);
                }
            }
            sources.push(parsed.source);
        }

        Some(Segment {
            id: NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed),
            fields,
            doc_values,
            documents: sources,
        })
    }
}
