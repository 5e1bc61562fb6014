//! Classifiers trained on a shard's documents and the results they produce.
//!
//! Every model implements [`Classifier`]; [`ClassifierModel`] selects one
//! from a request's model type and settings, and
//! [`ShardClassificationService`] runs the train-then-evaluate pipeline on a
//! single shard.

pub mod classifier;
pub mod knn;
pub mod naive_bayes;
pub mod perceptron;
pub mod result;
pub mod service;

pub use classifier::{Classifier, ClassifierModel, DEFAULT_MODEL_TYPE, ModelType};
pub use knn::KnnClassifier;
pub use naive_bayes::{CachingNaiveBayesClassifier, SimpleNaiveBayesClassifier};
pub use perceptron::BooleanPerceptronClassifier;
pub use result::{ClassificationResult, ClassifyResult, sort_results};
pub use service::ShardClassificationService;
