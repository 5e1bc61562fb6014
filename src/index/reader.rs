//! Point-in-time readers over a shard's segments.
//!
//! A [`CompositeReader`] is the list of segments visible when a searcher was
//! acquired. [`LeafReader`] flattens it into a single document-id space:
//! segment `i`'s documents are rebased by the sum of the previous segments'
//! sizes and term dictionaries are merged.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::document::StoredDocument;
use crate::index::segment::{DocId, FieldStats, Posting, Segment, TermInfo};

/// An immutable list of segments.
#[derive(Debug, Clone, Default)]
pub struct CompositeReader {
    segments: Arc<Vec<Arc<Segment>>>,
}

impl CompositeReader {
    pub fn new(segments: Arc<Vec<Arc<Segment>>>) -> Self {
        CompositeReader { segments }
    }

    pub fn segments(&self) -> &[Arc<Segment>] {
        &self.segments
    }

    pub fn max_doc(&self) -> u32 {
        self.segments.iter().map(|s| s.max_doc()).sum()
    }
}

/// Merged statistics and term dictionary of one field.
#[derive(Debug, Clone, Default)]
pub struct Terms {
    pub stats: FieldStats,
    terms: BTreeMap<Vec<u8>, TermInfo>,
}

impl Terms {
    /// Terms in byte order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &TermInfo)> + '_ {
        self.terms.iter().map(|(term, info)| (term.as_slice(), info))
    }

    pub fn get(&self, term: &[u8]) -> Option<&TermInfo> {
        self.terms.get(term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// A flat view over every segment of a [`CompositeReader`].
#[derive(Debug, Clone)]
pub struct LeafReader {
    segments: Arc<Vec<Arc<Segment>>>,
    bases: Vec<DocId>,
    max_doc: u32,
}

impl LeafReader {
    /// Flatten a composite reader into one leaf.
    pub fn wrap(reader: &CompositeReader) -> Self {
        let mut bases = Vec::with_capacity(reader.segments.len());
        let mut max_doc = 0;
        for segment in reader.segments.iter() {
            bases.push(max_doc);
            max_doc += segment.max_doc();
        }
        LeafReader {
            segments: Arc::clone(&reader.segments),
            bases,
            max_doc,
        }
    }

    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    /// Live documents; segments are never modified so this equals `max_doc`.
    pub fn num_docs(&self) -> u32 {
        self.max_doc
    }

    fn locate(&self, doc: DocId) -> Option<(&Segment, DocId)> {
        if doc >= self.max_doc {
            return None;
        }
        let index = self.bases.partition_point(|&base| base <= doc) - 1;
        Some((&self.segments[index], doc - self.bases[index]))
    }

    /// Merged term dictionary of `field`, or `None` if no segment indexes it.
    pub fn terms(&self, field: &str) -> Option<Terms> {
        let mut merged: Option<Terms> = None;
        for segment in self.segments.iter() {
            let Some(index) = segment.field(field) else {
                continue;
            };
            let terms = merged.get_or_insert_with(Terms::default);
            terms.stats.merge(&index.stats());
            for (term, info) in index.terms() {
                let entry = terms.terms.entry(term.to_vec()).or_default();
                entry.doc_freq += info.doc_freq;
                entry.total_term_freq += info.total_term_freq;
            }
        }
        merged
    }

    pub fn field_stats(&self, field: &str) -> Option<FieldStats> {
        let mut stats: Option<FieldStats> = None;
        for segment in self.segments.iter() {
            if let Some(index) = segment.field(field) {
                stats.get_or_insert_with(FieldStats::default).merge(&index.stats());
            }
        }
        stats
    }

    /// Number of documents containing `term` in `field`.
    pub fn doc_freq(&self, field: &str, term: &[u8]) -> u32 {
        self.segments
            .iter()
            .filter_map(|segment| segment.field(field))
            .filter_map(|index| index.postings(term))
            .map(|postings| postings.len() as u32)
            .sum()
    }

    pub fn total_term_freq(&self, field: &str, term: &[u8]) -> u64 {
        self.postings(field, term)
            .iter()
            .map(|posting| u64::from(posting.freq))
            .sum()
    }

    /// Posting list of `term` with rebased, ascending document ids.
    pub fn postings(&self, field: &str, term: &[u8]) -> Vec<Posting> {
        let mut merged = Vec::new();
        for (segment, &base) in self.segments.iter().zip(&self.bases) {
            if let Some(postings) = segment.field(field).and_then(|index| index.postings(term)) {
                merged.extend(postings.iter().map(|posting| Posting {
                    doc: posting.doc + base,
                    freq: posting.freq,
                }));
            }
        }
        merged
    }

    /// Number of terms `doc` has in `field`.
    pub fn field_length(&self, field: &str, doc: DocId) -> u32 {
        self.locate(doc)
            .and_then(|(segment, local)| segment.field(field).map(|index| index.length(local)))
            .unwrap_or(0)
    }

    /// Sorted `(term, freq)` pairs of `doc` in `field`, if term vectors are kept.
    pub fn term_vector(&self, field: &str, doc: DocId) -> Option<&[(Vec<u8>, u32)]> {
        let (segment, local) = self.locate(doc)?;
        segment.field(field)?.term_vector(local)
    }

    pub fn doc_value(&self, field: &str, doc: DocId) -> Option<&[u8]> {
        let (segment, local) = self.locate(doc)?;
        segment.doc_value(field, local)
    }

    pub fn document(&self, doc: DocId) -> Option<&StoredDocument> {
        let (segment, local) = self.locate(doc)?;
        segment.document(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StoredDocument;
    use crate::index::mapper::{ParsedDocument, ParsedField};
    use crate::index::segment::SegmentWriter;
    use serde_json::json;

    fn segment(docs: Vec<(&str, Vec<&str>)>) -> Arc<Segment> {
        let mut writer = SegmentWriter::new();
        for (id, terms) in docs {
            writer.add_document(ParsedDocument {
                source: StoredDocument::new(id, "doc", json!({"id": id})),
                fields: vec![ParsedField {
                    name: "body".into(),
                    terms: terms.iter().map(|t| t.as_bytes().to_vec()).collect(),
                    term_vector: true,
                    doc_value: Some(id.as_bytes().to_vec()),
                }],
            });
        }
        Arc::new(writer.flush().unwrap())
    }

    fn leaf() -> LeafReader {
        let segments = vec![
            segment(vec![("a", vec!["x", "y"]), ("b", vec!["y"])]),
            segment(vec![("c", vec!["y", "y", "z"])]),
        ];
        LeafReader::wrap(&CompositeReader::new(Arc::new(segments)))
    }

    #[test]
    fn test_rebased_postings() {
        let leaf = leaf();
        assert_eq!(leaf.max_doc(), 3);
        assert_eq!(
            leaf.postings("body", b"y"),
            vec![
                Posting { doc: 0, freq: 1 },
                Posting { doc: 1, freq: 1 },
                Posting { doc: 2, freq: 2 }
            ]
        );
        assert_eq!(leaf.doc_freq("body", b"y"), 3);
        assert_eq!(leaf.total_term_freq("body", b"y"), 4);
        assert_eq!(leaf.doc_freq("body", b"missing"), 0);
    }

    #[test]
    fn test_merged_terms() {
        let terms = leaf().terms("body").unwrap();
        let names: Vec<&[u8]> = terms.iter().map(|(t, _)| t).collect();
        assert_eq!(names, vec![&b"x"[..], &b"y"[..], &b"z"[..]]);
        assert_eq!(terms.stats.doc_count, 3);
        assert_eq!(terms.stats.sum_doc_freq, 5);
        assert_eq!(terms.stats.sum_total_term_freq, 6);
        assert!(leaf().terms("other").is_none());
    }

    #[test]
    fn test_per_document_access() {
        let leaf = leaf();
        assert_eq!(leaf.document(2).unwrap().id, "c");
        assert_eq!(leaf.doc_value("body", 1), Some(&b"b"[..]));
        assert_eq!(leaf.field_length("body", 2), 3);
        assert_eq!(
            leaf.term_vector("body", 2).unwrap(),
            &[(b"y".to_vec(), 2), (b"z".to_vec(), 1)]
        );
        assert!(leaf.document(3).is_none());
    }
}
