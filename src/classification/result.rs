//! Classification results and the per-shard result container.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec::{self, ClassValue};
use crate::error::Result;
use crate::transport::stream::{StreamInput, StreamOutput};

/// A class assigned by a classifier together with its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult<T> {
    #[serde(rename = "value")]
    pub assigned_class: T,
    pub score: f64,
}

impl<T> ClassificationResult<T> {
    pub fn new(assigned_class: T, score: f64) -> Self {
        ClassificationResult {
            assigned_class,
            score,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ClassificationResult<U> {
        ClassificationResult {
            assigned_class: f(self.assigned_class),
            score: self.score,
        }
    }
}

impl<T: Ord> ClassificationResult<T> {
    /// Score descending, then class ascending.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.assigned_class.cmp(&other.assigned_class))
    }
}

/// Sort results best first.
pub fn sort_results<T: Ord>(results: &mut [ClassificationResult<T>]) {
    results.sort_by(|a, b| a.rank_cmp(b));
}

/// Scores per class value, as returned by one shard or aggregated over many.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifyResult {
    scores: BTreeMap<ClassValue, f64>,
}

impl ClassifyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = ClassificationResult<ClassValue>>,
    {
        let mut container = ClassifyResult::new();
        for result in results {
            container.add(result);
        }
        container
    }

    pub fn add(&mut self, result: ClassificationResult<ClassValue>) {
        self.add_with_factor(result, 1.0);
    }

    /// Accumulate `factor * result.score` onto the result's class.
    pub fn add_with_factor(&mut self, result: ClassificationResult<ClassValue>, factor: f64) {
        *self.scores.entry(result.assigned_class).or_insert(0.0) += factor * result.score;
    }

    /// Mean of `results`, counting classes a result lacks as zero.
    pub fn from_average(results: &[ClassifyResult]) -> Self {
        let mut average = ClassifyResult::new();
        if results.is_empty() {
            return average;
        }
        let factor = 1.0 / results.len() as f64;
        for result in results {
            for (class, score) in &result.scores {
                average.add_with_factor(ClassificationResult::new(class.clone(), *score), factor);
            }
        }
        average
    }

    pub fn score(&self, class: &ClassValue) -> Option<f64> {
        self.scores.get(class).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// All results, best first.
    pub fn sorted(&self) -> Vec<ClassificationResult<ClassValue>> {
        let mut results: Vec<_> = self
            .scores
            .iter()
            .map(|(class, score)| ClassificationResult::new(class.clone(), *score))
            .collect();
        sort_results(&mut results);
        results
    }

    /// The `n` best results.
    pub fn top(&self, n: usize) -> Vec<ClassificationResult<ClassValue>> {
        let mut results = self.sorted();
        results.truncate(n);
        results
    }

    pub fn write_to(&self, out: &mut StreamOutput) {
        out.write_vint(self.scores.len() as u32);
        for (class, score) in &self.scores {
            codec::write_class_value(out, class);
            out.write_f64(*score);
        }
    }

    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let count = input.read_vint()?;
        let mut result = ClassifyResult::new();
        for _ in 0..count {
            let class = codec::read_class_value(input)?;
            let score = input.read_f64()?;
            result.add(ClassificationResult::new(class, score));
        }
        Ok(result)
    }
}
