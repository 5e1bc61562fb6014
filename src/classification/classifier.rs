//! The classifier capability and the per-request model selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::classification::knn::KnnClassifier;
use crate::classification::naive_bayes::{CachingNaiveBayesClassifier, SimpleNaiveBayesClassifier};
use crate::classification::perceptron::BooleanPerceptronClassifier;
use crate::classification::result::ClassificationResult;
use crate::codec::ClassKey;
use crate::error::{Result, SarissaError};
use crate::index::reader::LeafReader;
use crate::query::Query;
use crate::settings::Settings;

/// Model used when a request names none.
pub const DEFAULT_MODEL_TYPE: ModelType = ModelType::SimpleNaiveBayes;

pub const DEFAULT_BOOLEAN_PERCEPTRON_BATCH_SIZE: i32 = 1;

pub const DEFAULT_KNN_K: i32 = 3;

/// A classifier trained on the documents of one shard.
pub trait Classifier: Send {
    /// Train on the documents of `reader` matching `query` (all documents if `None`).
    fn train(
        &mut self,
        reader: &LeafReader,
        text_fields: &[String],
        class_field: &str,
        analyzer: Arc<dyn Analyzer>,
        query: Option<Box<dyn Query>>,
    ) -> Result<()>;

    /// Up to `max` classes for `text`, best first.
    fn get_classes(&self, text: &str, max: usize) -> Result<Vec<ClassificationResult<ClassKey>>>;

    /// The best class for `text`, if any.
    fn assign_class(&self, text: &str) -> Result<Option<ClassificationResult<ClassKey>>> {
        Ok(self.get_classes(text, 1)?.into_iter().next())
    }

    fn name(&self) -> &'static str;
}

/// The supported models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    SimpleNaiveBayes,
    CachingNaiveBayes,
    BooleanPerceptron,
    Knn,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::SimpleNaiveBayes => "simple_naive_bayes",
            ModelType::CachingNaiveBayes => "caching_naive_bayes",
            ModelType::BooleanPerceptron => "boolean_perceptron",
            ModelType::Knn => "knn",
        }
    }

    pub fn all() -> [ModelType; 4] {
        [
            ModelType::SimpleNaiveBayes,
            ModelType::CachingNaiveBayes,
            ModelType::BooleanPerceptron,
            ModelType::Knn,
        ]
    }
}

impl Default for ModelType {
    fn default() -> Self {
        DEFAULT_MODEL_TYPE
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = SarissaError;

    fn from_str(s: &str) -> Result<Self> {
        ModelType::all()
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| SarissaError::invalid_argument(format!("unknown model type [{s}]")))
    }
}

/// A configured classifier of one of the supported models.
#[derive(Debug)]
pub enum ClassifierModel {
    SimpleNaiveBayes(SimpleNaiveBayesClassifier),
    CachingNaiveBayes(CachingNaiveBayesClassifier),
    BooleanPerceptron(BooleanPerceptronClassifier),
    Knn(KnnClassifier),
}

impl ClassifierModel {
    /// Build an untrained classifier of `model_type` configured from `settings`.
    ///
    /// Recognised settings: `threshold` and `batch_size` for the boolean
    /// perceptron; `k`, `min_doc_freq` and `min_term_freq` for KNN.
    pub fn from_settings(model_type: ModelType, settings: &Settings) -> Result<Self> {
        Ok(match model_type {
            ModelType::SimpleNaiveBayes => {
                ClassifierModel::SimpleNaiveBayes(SimpleNaiveBayesClassifier::new())
            }
            ModelType::CachingNaiveBayes => {
                ClassifierModel::CachingNaiveBayes(CachingNaiveBayesClassifier::new())
            }
            ModelType::BooleanPerceptron => {
                let threshold = settings.get_as_f64("threshold")?;
                let batch_size = settings
                    .get_as_i32("batch_size")?
                    .unwrap_or(DEFAULT_BOOLEAN_PERCEPTRON_BATCH_SIZE);
                if batch_size < 1 {
                    return Err(SarissaError::invalid_argument(format!(
                        "batch_size must be positive, got [{batch_size}]"
                    )));
                }
                ClassifierModel::BooleanPerceptron(BooleanPerceptronClassifier::new(
                    threshold,
                    batch_size as usize,
                ))
            }
            ModelType::Knn => {
                let k = settings.get_as_i32("k")?.unwrap_or(DEFAULT_KNN_K);
                if k < 1 {
                    return Err(SarissaError::invalid_argument(format!(
                        "k must be positive, got [{k}]"
                    )));
                }
                let min_doc_freq = settings.get_as_i32("min_doc_freq")?.unwrap_or(0);
                let min_term_freq = settings.get_as_i32("min_term_freq")?.unwrap_or(0);
                ClassifierModel::Knn(KnnClassifier::with_frequencies(
                    k as usize,
                    min_doc_freq.max(0) as u32,
                    min_term_freq.max(0) as u32,
                ))
            }
        })
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            ClassifierModel::SimpleNaiveBayes(c) => c,
            ClassifierModel::CachingNaiveBayes(c) => c,
            ClassifierModel::BooleanPerceptron(c) => c,
            ClassifierModel::Knn(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            ClassifierModel::SimpleNaiveBayes(c) => c,
            ClassifierModel::CachingNaiveBayes(c) => c,
            ClassifierModel::BooleanPerceptron(c) => c,
            ClassifierModel::Knn(c) => c,
        }
    }
}

impl Classifier for ClassifierModel {
    fn train(
        &mut self,
        reader: &LeafReader,
        text_fields: &[String],
        class_field: &str,
        analyzer: Arc<dyn Analyzer>,
        query: Option<Box<dyn Query>>,
    ) -> Result<()> {
        self.inner_mut()
            .train(reader, text_fields, class_field, analyzer, query)
    }

    fn get_classes(&self, text: &str, max: usize) -> Result<Vec<ClassificationResult<ClassKey>>> {
        self.inner().get_classes(text, max)
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

/// Failure returned by classifiers used before training.
pub(crate) fn not_trained() -> SarissaError {
    SarissaError::evaluation(
        "classifier has not been trained",
        SarissaError::invalid_argument("you must first call Classifier::train"),
    )
}
