//! Trains and evaluates a classifier against one shard.

use std::sync::Arc;

use log::debug;

use crate::action::ClassifyRequest;
use crate::analysis::Analyzer;
use crate::classification::classifier::{Classifier, ClassifierModel, DEFAULT_MODEL_TYPE};
use crate::classification::result::{ClassificationResult, ClassifyResult};
use crate::codec::ClassKey;
use crate::error::{Result, SarissaError};
use crate::index::IndexShard;
use crate::query::{JsonQueryParser, Query, QueryParser};

/// Name under which classification acquires its searcher.
pub const SEARCHER_SOURCE: &str = "classify";

/// Runs the classification pipeline on a single shard.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShardClassificationService;

impl ShardClassificationService {
    pub fn new() -> Self {
        ShardClassificationService
    }

    /// Train the requested model on `shard` and score `request.eval_on()`.
    pub fn evaluate(&self, shard: &IndexShard, request: &ClassifyRequest) -> Result<ClassifyResult> {
        let model_type = request.model_type().unwrap_or(DEFAULT_MODEL_TYPE);
        let classifier = ClassifierModel::from_settings(model_type, request.model_settings())?;

        let first_field = request.text_fields().first().ok_or_else(|| {
            SarissaError::invalid_argument(
                "name of the field used to compare documents is either missing or empty",
            )
        })?;
        let analyzer = match request.analyzer() {
            Some(name) => shard.analysis().analyzer(name)?,
            None => shard.mapper().index_analyzer(request.train_type(), first_field)?,
        };

        let query: Option<Box<dyn Query>> = match request.train_query() {
            Some(source) => Some(
                JsonQueryParser::new(shard.mapper().clone(), request.train_type()).parse(source)?,
            ),
            None => None,
        };

        let classes = Self::evaluate_snapshot(shard, request, classifier, analyzer, query)?;

        if classes.is_empty() {
            return Ok(ClassifyResult::new());
        }
        let kind = shard
            .schema()
            .field_kind(request.train_type(), request.class_field())?;
        let mut result = ClassifyResult::new();
        for class in classes {
            result.add(ClassificationResult::new(
                class.assigned_class.decode(kind)?,
                class.score,
            ));
        }
        Ok(result)
    }

    /// Train and evaluate against one searcher snapshot.
    ///
    /// The classifier owns clones of the snapshot's readers, so it is
    /// consumed here and dropped together with the searcher.
    fn evaluate_snapshot(
        shard: &IndexShard,
        request: &ClassifyRequest,
        mut classifier: ClassifierModel,
        analyzer: Arc<dyn Analyzer>,
        query: Option<Box<dyn Query>>,
    ) -> Result<Vec<ClassificationResult<ClassKey>>> {
        let searcher = shard.acquire_searcher(SEARCHER_SOURCE)?;
        let reader = searcher.leaf_reader();
        classifier
            .train(
                &reader,
                request.text_fields(),
                request.class_field(),
                analyzer,
                query,
            )
            .map_err(|e| SarissaError::training("failed to train model", e))?;
        debug!(
            "{} trained {} on {} docs",
            shard.shard_id(),
            classifier.name(),
            reader.num_docs()
        );
        classifier
            .get_classes(request.eval_on(), request.top_n())
            .map_err(|e| match e {
                e @ SarissaError::Evaluation { .. } => e,
                e => SarissaError::evaluation("failed to evaluate model", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analysis::AnalysisRegistry;
    use crate::classification::ModelType;
    use crate::codec::ClassValue;
    use crate::document::StoredDocument;
    use crate::error::ErrorKind;
    use crate::index::ShardId;
    use crate::schema::{FieldKind, FieldMapping, Schema, TypeMapping};
    use crate::settings::Settings;
    use serde_json::json;

    fn shard() -> IndexShard {
        let schema = Schema::new().with_type(
            "doc",
            TypeMapping::new()
                .field("body", FieldMapping::new(FieldKind::Text))
                .field("spam", FieldMapping::new(FieldKind::Boolean))
                .field("lang", FieldMapping::new(FieldKind::Keyword)),
        );
        let shard = IndexShard::new(
            ShardId::new("mail", 0),
            Arc::new(schema),
            Arc::new(AnalysisRegistry::new().unwrap()),
        );
        let docs = [
            ("cheap pills now", true, "en"),
            ("cheap offer pills", true, "en"),
            ("meeting notes today", false, "en"),
            ("lunch meeting today", false, "de"),
        ];
        for (i, (body, spam, lang)) in docs.iter().enumerate() {
            let source = json!({"body": body, "spam": spam, "lang": lang});
            shard
                .index(StoredDocument::new(i.to_string(), "doc", source))
                .unwrap();
        }
        shard.refresh().unwrap();
        shard
    }

    fn request(model: ModelType) -> ClassifyRequest {
        ClassifyRequest::builder("mail", "doc")
            .text_field("body")
            .class_field("spam")
            .eval_on("cheap pills")
            .model_type(model)
            .top_n(2)
            .build()
    }

    #[test]
    fn test_decodes_boolean_classes() {
        let shard = shard();
        for model in [ModelType::SimpleNaiveBayes, ModelType::CachingNaiveBayes] {
            let result = ShardClassificationService::new()
                .evaluate(&shard, &request(model))
                .unwrap();
            let top = result.top(2);
            assert_eq!(top[0].assigned_class, ClassValue::Bool(true), "{model}");
            assert_eq!(top.len(), 2);
        }
        assert_eq!(shard.searcher_stats().open(), 0);
        assert_eq!(shard.searcher_stats().acquired(), 2);
    }

    #[test]
    fn test_training_errors_release_the_searcher() {
        let shard = shard();
        let mut request = request(ModelType::BooleanPerceptron);
        request.set_text_fields(vec!["body", "lang"]);
        let err = ShardClassificationService::new()
            .evaluate(&shard, &request)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
        assert_eq!(err.root_cause().kind(), ErrorKind::UnsupportedArity);
        assert_eq!(shard.searcher_stats().open(), 0);
    }

    #[test]
    fn test_bad_settings_and_analyzer() {
        let shard = shard();
        let mut knn_request = request(ModelType::Knn);
        knn_request.set_model_settings(Settings::builder().put("k", 0).build());
        let err = ShardClassificationService::new()
            .evaluate(&shard, &knn_request)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut request = request(ModelType::SimpleNaiveBayes);
        request.set_analyzer("klingon");
        let err = ShardClassificationService::new()
            .evaluate(&shard, &request)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(shard.searcher_stats().acquired(), 0);
    }

    #[test]
    fn test_train_query_restricts_documents() {
        let shard = shard();
        let mut request = request(ModelType::SimpleNaiveBayes);
        request
            .set_train_query_json(&json!({"term": {"lang": "de"}}))
            .unwrap();
        let result = ShardClassificationService::new()
            .evaluate(&shard, &request)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.score(&ClassValue::Bool(false)), Some(1.0));
    }

    #[test]
    fn test_trained_models_do_not_pin_the_snapshot() {
        let shard = shard();
        let searcher = shard.acquire_searcher("check").unwrap();
        assert_eq!(shard.pinned_snapshots(), 1);
        drop(searcher);

        for model in ModelType::all() {
            let mut request = request(model);
            request.set_model_settings(
                Settings::builder()
                    .put("k", 2)
                    .put("min_doc_freq", 1)
                    .put("min_term_freq", 1)
                    .build(),
            );
            let classifier = ClassifierModel::from_settings(model, request.model_settings()).unwrap();
            let analyzer = shard.mapper().index_analyzer("doc", "body").unwrap();
            let classes =
                ShardClassificationService::evaluate_snapshot(&shard, &request, classifier, analyzer, None)
                    .unwrap();
            assert!(!classes.is_empty(), "{model}");
            assert_eq!(shard.pinned_snapshots(), 0, "{model}");
        }
        assert_eq!(shard.searcher_stats().open(), 0);
    }

    #[test]
    fn test_closed_shard_is_unavailable() {
        let shard = shard();
        shard.close();
        let err = ShardClassificationService::new()
            .evaluate(&shard, &request(ModelType::SimpleNaiveBayes))
            .unwrap_err();
        assert!(err.is_shard_not_available());
    }
}
