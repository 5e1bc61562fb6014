//! k-nearest-neighbour classification over more-like-this queries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::analysis::Analyzer;
use crate::classification::classifier::{Classifier, DEFAULT_KNN_K, not_trained};
use crate::classification::result::{ClassificationResult, sort_results};
use crate::codec::ClassKey;
use crate::error::Result;
use crate::index::reader::LeafReader;
use crate::index::searcher::IndexSearcher;
use crate::query::Query;
use crate::query::boolean::{BooleanQuery, Occur};
use crate::query::collector::TopDocs;
use crate::query::more_like_this::MoreLikeThis;
use crate::query::wildcard::WildcardQuery;

struct Model {
    mlt: MoreLikeThis,
    searcher: IndexSearcher,
    text_fields: Vec<String>,
    class_field: String,
    query: Option<Box<dyn Query>>,
}

/// Classifies a probe by the classes of its `k` most similar documents.
pub struct KnnClassifier {
    k: usize,
    min_doc_freq: u32,
    min_term_freq: u32,
    model: Option<Model>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self::with_frequencies(k, 0, 0)
    }

    /// Zero frequencies keep the more-like-this defaults.
    pub fn with_frequencies(k: usize, min_doc_freq: u32, min_term_freq: u32) -> Self {
        KnnClassifier {
            k: k.max(1),
            min_doc_freq,
            min_term_freq,
            model: None,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn search(&self, model: &Model, text: &str) -> Result<TopDocs> {
        let mut query = BooleanQuery::new();
        for field in &model.text_fields {
            query.add(Box::new(model.mlt.like(field, text)?), Occur::Should);
        }
        query.add(
            Box::new(WildcardQuery::new(model.class_field.as_str(), "*")?),
            Occur::Must,
        );
        if let Some(filter) = &model.query {
            query.add(filter.clone(), Occur::Must);
        }
        model.searcher.search(&query, self.k)
    }

    fn tally(&self, model: &Model, top_docs: &TopDocs) -> Vec<ClassificationResult<ClassKey>> {
        let mut counts: BTreeMap<Vec<u8>, usize> = BTreeMap::new();
        for hit in &top_docs.score_docs {
            if let Some(class) = model.searcher.reader().doc_value(&model.class_field, hit.doc) {
                *counts.entry(class.to_vec()).or_insert(0) += 1;
            }
        }

        let k = self.k as f64;
        let total: usize = counts.values().sum();
        let correction = if total > 0 && total < self.k {
            k / total as f64
        } else {
            1.0
        };
        counts
            .into_iter()
            .map(|(class, count)| {
                ClassificationResult::new(ClassKey::Term(class), count as f64 / k * correction)
            })
            .collect()
    }
}

impl Default for KnnClassifier {
    fn default() -> Self {
        KnnClassifier::new(DEFAULT_KNN_K as usize)
    }
}

impl Classifier for KnnClassifier {
    fn train(
        &mut self,
        reader: &LeafReader,
        text_fields: &[String],
        class_field: &str,
        analyzer: Arc<dyn Analyzer>,
        query: Option<Box<dyn Query>>,
    ) -> Result<()> {
        let mut mlt = MoreLikeThis::new(reader.clone(), analyzer, text_fields.to_vec());
        if self.min_doc_freq > 0 {
            mlt.set_min_doc_freq(self.min_doc_freq);
        }
        if self.min_term_freq > 0 {
            mlt.set_min_term_freq(self.min_term_freq);
        }
        debug!(
            "trained knn on [{class_field}]: k {}, min_doc_freq {}, min_term_freq {}",
            self.k,
            mlt.min_doc_freq(),
            mlt.min_term_freq()
        );
        self.model = Some(Model {
            mlt,
            searcher: IndexSearcher::new(reader.clone()),
            text_fields: text_fields.to_vec(),
            class_field: class_field.to_string(),
            query,
        });
        Ok(())
    }

    fn get_classes(&self, text: &str, max: usize) -> Result<Vec<ClassificationResult<ClassKey>>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        let top_docs = self.search(model, text)?;
        let mut results = self.tally(model, &top_docs);
        sort_results(&mut results);
        results.truncate(max);
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "knn"
    }
}

impl fmt::Debug for KnnClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnnClassifier")
            .field("k", &self.k)
            .field("min_doc_freq", &self.min_doc_freq)
            .field("min_term_freq", &self.min_term_freq)
            .field("trained", &self.model.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisRegistry;
    use crate::query::TermQuery;
    use crate::schema::{FieldKind, FieldMapping, Schema, TypeMapping};
    use crate::test_support::index_documents;
    use serde_json::json;

    fn reader() -> LeafReader {
        let schema = Schema::new().with_type(
            "doc",
            TypeMapping::new()
                .field("body", FieldMapping::new(FieldKind::Text))
                .field("topic", FieldMapping::new(FieldKind::Keyword))
                .field("year", FieldMapping::new(FieldKind::Integer)),
        );
        index_documents(
            schema,
            vec![
                json!({"body": "apple banana", "topic": "x", "year": 2020}),
                json!({"body": "apple cherry", "topic": "x", "year": 2021}),
                json!({"body": "apple durian", "topic": "y", "year": 2021}),
                json!({"body": "apple without topic"}),
            ],
        )
    }

    fn trained(k: usize, query: Option<Box<dyn Query>>) -> KnnClassifier {
        let mut knn = KnnClassifier::with_frequencies(k, 1, 1);
        knn.train(
            &reader(),
            &["body".to_string()],
            "topic",
            AnalysisRegistry::new().unwrap().default_analyzer().unwrap(),
            query,
        )
        .unwrap();
        knn
    }

    fn scores(results: &[ClassificationResult<ClassKey>]) -> Vec<(Vec<u8>, f64)> {
        results
            .iter()
            .map(|r| match &r.assigned_class {
                ClassKey::Term(term) => (term.clone(), r.score),
                other => panic!("unexpected class {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_scores_are_counts_over_k() {
        let results = scores(&trained(3, None).get_classes("apple", 10).unwrap());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, b"x".to_vec());
        assert!((results[0].1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(results[1].0, b"y".to_vec());
        assert!((results[1].1 - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fewer_hits_than_k_are_rescaled() {
        let results = scores(&trained(5, None).get_classes("apple", 10).unwrap());
        let total: f64 = results.iter().map(|(_, score)| score).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((results[0].1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_filter_and_nearest_first() {
        let filter: Box<dyn Query> = Box::new(TermQuery::new(
            "year",
            crate::util::numeric::int_to_prefix_coded(2021, 0),
        ));
        let knn = trained(1, Some(filter));
        let results = scores(&knn.get_classes("durian", 10).unwrap());
        assert_eq!(results, vec![(b"y".to_vec(), 1.0)]);
        assert_eq!(knn.get_classes("cherry", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_untrained() {
        assert!(KnnClassifier::default().get_classes("apple", 1).is_err());
        assert_eq!(KnnClassifier::default().k(), 3);
    }
}
