//! Boolean perceptron over the terms of a single text field.
//!
//! Weights start at each term's total frequency and are corrected for every
//! misclassified training document by `± tf` of its terms, floored at zero.
//! The weights used for classification are republished every `batch_size`
//! documents.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;

use crate::analysis::Analyzer;
use crate::classification::classifier::{Classifier, not_trained};
use crate::classification::result::ClassificationResult;
use crate::codec::{ClassKey, ClassValue};
use crate::document::FieldValue;
use crate::error::{Result, SarissaError};
use crate::index::reader::LeafReader;
use crate::index::searcher::IndexSearcher;
use crate::query::Query;
use crate::query::boolean::BooleanQuery;
use crate::query::wildcard::WildcardQuery;

struct Model {
    analyzer: Arc<dyn Analyzer>,
    threshold: f64,
    weights: AHashMap<String, i64>,
}

impl Model {
    fn classify(&self, text: &str) -> Result<(bool, f64)> {
        let output: i64 = self
            .analyzer
            .terms(text)?
            .iter()
            .filter_map(|term| self.weights.get(term))
            .sum();
        let output = output as f64;
        let score = 1.0 - (-(self.threshold - output).abs() / self.threshold).exp();
        Ok((output >= self.threshold, score))
    }
}

/// A perceptron deciding between `true` and `false`.
pub struct BooleanPerceptronClassifier {
    threshold: Option<f64>,
    batch_size: usize,
    model: Option<Model>,
}

impl BooleanPerceptronClassifier {
    /// A `threshold` of `None` or zero is derived from the training data.
    pub fn new(threshold: Option<f64>, batch_size: usize) -> Self {
        BooleanPerceptronClassifier {
            threshold,
            batch_size: batch_size.max(1),
            model: None,
        }
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The threshold in effect after training.
    pub fn trained_threshold(&self) -> Option<f64> {
        self.model.as_ref().map(|m| m.threshold)
    }

    /// The published weight of `term`, if trained.
    pub fn weight(&self, term: &str) -> Option<i64> {
        self.model.as_ref()?.weights.get(term).copied()
    }
}

impl Default for BooleanPerceptronClassifier {
    fn default() -> Self {
        BooleanPerceptronClassifier::new(None, 1)
    }
}

fn publish(weights: &BTreeMap<String, f64>) -> AHashMap<String, i64> {
    weights
        .iter()
        .map(|(term, weight)| (term.clone(), *weight as i64))
        .collect()
}

fn expected_class(value: &FieldValue) -> bool {
    match value {
        FieldValue::Boolean(b) => *b,
        FieldValue::Text(s) => s.eq_ignore_ascii_case("true"),
        FieldValue::Integer(_) | FieldValue::Float(_) => false,
    }
}

impl Classifier for BooleanPerceptronClassifier {
    fn train(
        &mut self,
        reader: &LeafReader,
        text_fields: &[String],
        class_field: &str,
        analyzer: Arc<dyn Analyzer>,
        query: Option<Box<dyn Query>>,
    ) -> Result<()> {
        let [text_field] = text_fields else {
            return Err(SarissaError::unsupported_arity(format!(
                "boolean perceptron supports exactly one text field, got {}",
                text_fields.len()
            )));
        };

        let terms = reader.terms(text_field).ok_or_else(|| {
            SarissaError::invalid_argument(format!(
                "term vectors need to be available for field [{text_field}]"
            ))
        })?;

        let threshold = match self.threshold {
            Some(t) if t != 0.0 => t,
            _ => terms.stats.sum_doc_freq as f64 / 2.0,
        };

        let mut weights: BTreeMap<String, f64> = terms
            .iter()
            .map(|(term, info)| {
                (
                    String::from_utf8_lossy(term).into_owned(),
                    info.total_term_freq as f64,
                )
            })
            .collect();

        let mut model = Model {
            analyzer,
            threshold,
            weights: publish(&weights),
        };

        let mut training = BooleanQuery::new().must(Box::new(WildcardQuery::new(class_field, "*")?));
        if let Some(query) = query {
            training = training.must(query);
        }
        let searcher = IndexSearcher::new(reader.clone());
        let hits = searcher.search(&training, reader.max_doc() as usize)?;

        let mut batch_count = 0usize;
        let mut corrections = 0usize;
        for hit in &hits.score_docs {
            let Some(document) = reader.document(hit.doc) else {
                continue;
            };
            let (Some(text), Some(class)) = (
                document.first_value(text_field),
                document.first_value(class_field),
            ) else {
                continue;
            };

            let (assigned, _) = model.classify(&text.as_text())?;
            let modifier = expected_class(&class).cmp(&assigned) as i64;
            if modifier != 0 {
                let vector = reader.term_vector(text_field, hit.doc).ok_or_else(|| {
                    SarissaError::invalid_argument(format!(
                        "term vectors must be stored for field [{text_field}]"
                    ))
                })?;
                for (term, freq) in vector {
                    let term = String::from_utf8_lossy(term).into_owned();
                    let updated = match model.weights.get(&term) {
                        None => 0.0,
                        Some(previous) => (*previous as f64 + modifier as f64 * f64::from(*freq)).max(0.0),
                    };
                    weights.insert(term, updated);
                }
                if batch_count % self.batch_size == 0 {
                    model.weights = publish(&weights);
                }
                corrections += 1;
            }
            batch_count += 1;
        }

        debug!(
            "trained boolean perceptron on [{text_field}]: threshold {threshold}, {batch_count} documents, {corrections} corrections"
        );
        self.model = Some(model);
        Ok(())
    }

    fn get_classes(&self, text: &str, max: usize) -> Result<Vec<ClassificationResult<ClassKey>>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        if max == 0 {
            return Ok(Vec::new());
        }
        let (class, score) = model.classify(text)?;
        Ok(vec![ClassificationResult::new(
            ClassKey::Value(ClassValue::Bool(class)),
            score,
        )])
    }

    fn name(&self) -> &'static str {
        "boolean_perceptron"
    }
}

impl fmt::Debug for BooleanPerceptronClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BooleanPerceptronClassifier")
            .field("threshold", &self.threshold)
            .field("batch_size", &self.batch_size)
            .field("trained", &self.model.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisRegistry;
    use crate::error::ErrorKind;
    use crate::query::TermQuery;
    use crate::schema::{FieldKind, FieldMapping, Schema, TypeMapping};
    use crate::test_support::index_documents;
    use serde_json::json;

    fn reader() -> LeafReader {
        let schema = Schema::new().with_type(
            "doc",
            TypeMapping::new()
                .field("body", FieldMapping::new(FieldKind::Text))
                .field("spam", FieldMapping::new(FieldKind::Boolean))
                .field("source", FieldMapping::new(FieldKind::Keyword)),
        );
        index_documents(
            schema,
            vec![
                json!({"body": "cheap pills cheap", "spam": true, "source": "web"}),
                json!({"body": "win cheap money", "spam": true, "source": "web"}),
                json!({"body": "meeting notes", "spam": false, "source": "mail"}),
                json!({"body": "team lunch notes", "spam": "false", "source": "mail"}),
            ],
        )
    }

    fn analyzer() -> Arc<dyn Analyzer> {
        AnalysisRegistry::new().unwrap().default_analyzer().unwrap()
    }

    fn body() -> Vec<String> {
        vec!["body".to_string()]
    }

    #[test]
    fn test_rejects_multiple_fields() {
        let mut classifier = BooleanPerceptronClassifier::default();
        let err = classifier
            .train(
                &reader(),
                &["t1".to_string(), "t2".to_string()],
                "spam",
                analyzer(),
                None,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedArity);
    }

    #[test]
    fn test_automatic_threshold_and_initial_weights() {
        let mut classifier = BooleanPerceptronClassifier::new(Some(0.0), 1);
        classifier
            .train(&reader(), &body(), "spam", analyzer(), Some(Box::new(TermQuery::new("source", "none"))))
            .unwrap();
        // sum_doc_freq = 2 + 3 + 2 + 3
        assert_eq!(classifier.trained_threshold(), Some(5.0));
        assert_eq!(classifier.weight("cheap"), Some(3));
        assert_eq!(classifier.weight("notes"), Some(2));
    }

    #[test]
    fn test_training_corrects_weights() {
        let mut classifier = BooleanPerceptronClassifier::new(Some(3.0), 1);
        classifier
            .train(&reader(), &body(), "spam", analyzer(), None)
            .unwrap();

        // Both ham documents reach the threshold and get corrected downwards.
        assert_eq!(classifier.weight("cheap"), Some(3));
        assert_eq!(classifier.weight("meeting"), Some(0));
        assert_eq!(classifier.weight("notes"), Some(0));
        assert_eq!(classifier.weight("lunch"), Some(0));

        let spam = classifier.get_classes("cheap pills", 3).unwrap();
        assert_eq!(spam.len(), 1);
        assert_eq!(spam[0].assigned_class, ClassKey::Value(ClassValue::Bool(true)));
        // output 4 against threshold 3
        assert!((spam[0].score - (1.0 - (-1.0f64 / 3.0).exp())).abs() < 1e-12);

        let ham = classifier.assign_class("meeting").unwrap().unwrap();
        assert_eq!(ham.assigned_class, ClassKey::Value(ClassValue::Bool(false)));
        assert!((ham.score - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_untrained() {
        let err = BooleanPerceptronClassifier::default()
            .get_classes("x", 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
    }
}
