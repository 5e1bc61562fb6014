//! Multinomial Naive Bayes with add-one smoothing.
//!
//! For a probe tokenized into words `w`, the score of class `c` is
//!
//! ```text
//! ln P(c) + Σ_w ln((hits(w, c) + 1) / (avgUniqueTerms · docs(c) + docsWithClass))
//! ```
//!
//! where `hits(w, c)` counts training documents of class `c` containing `w`
//! in any text field and `avgUniqueTerms` is the mean number of distinct
//! terms per document summed over the text fields. Scores are normalized
//! with log-sum-exp into a distribution over classes.
//!
//! Every count is restricted to the training filter. Classes without
//! training documents are not scored.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use bit_vec::BitVec;
use log::debug;

use crate::analysis::Analyzer;
use crate::classification::classifier::{Classifier, not_trained};
use crate::classification::result::{ClassificationResult, sort_results};
use crate::codec::ClassKey;
use crate::error::Result;
use crate::index::reader::LeafReader;
use crate::index::searcher::IndexSearcher;
use crate::index::segment::DocId;
use crate::query::Query;
use crate::query::boolean::BooleanQuery;
use crate::query::term::TermQuery;
use crate::query::wildcard::WildcardQuery;

/// Analyze `text` once per text field, concatenating the tokens.
fn tokenize(analyzer: &dyn Analyzer, text_fields: &[String], text: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    for _ in text_fields {
        tokens.extend(analyzer.terms(text)?);
    }
    Ok(tokens)
}

/// Mean number of distinct terms per document, summed over `text_fields`.
fn avg_unique_terms(reader: &LeafReader, text_fields: &[String]) -> f64 {
    text_fields
        .iter()
        .filter_map(|field| reader.field_stats(field))
        .filter(|stats| stats.doc_count > 0)
        .map(|stats| stats.sum_doc_freq as f64 / f64::from(stats.doc_count))
        .sum()
}

/// Turn log scores into probabilities: `exp(s - ln Σ exp(s_i))`.
fn normalize(mut scored: Vec<ClassificationResult<ClassKey>>) -> Vec<ClassificationResult<ClassKey>> {
    if scored.is_empty() {
        return scored;
    }
    sort_results(&mut scored);
    let max = scored[0].score;
    let sum: f64 = scored.iter().map(|r| (r.score - max).exp()).sum();
    let log_sum = max + sum.ln();
    for result in &mut scored {
        result.score = (result.score - log_sum).exp();
    }
    scored
}

fn word_probability(hits: usize, class_term_freq: f64, docs_with_class: usize) -> f64 {
    (hits as f64 + 1.0) / (class_term_freq + docs_with_class as f64)
}

struct SimpleModel {
    searcher: IndexSearcher,
    text_fields: Vec<String>,
    class_field: String,
    analyzer: Arc<dyn Analyzer>,
    query: Option<Box<dyn Query>>,
    docs_with_class: usize,
    avg_unique_terms: f64,
}

impl SimpleModel {
    fn restricted(&self, query: Box<dyn Query>) -> BooleanQuery {
        let mut restricted = BooleanQuery::new().must(query);
        if let Some(filter) = &self.query {
            restricted = restricted.filter(filter.clone());
        }
        restricted
    }

    fn class_doc_count(&self, class: &[u8]) -> Result<usize> {
        self.searcher.count(&self.restricted(Box::new(TermQuery::new(
            self.class_field.as_str(),
            class,
        ))))
    }

    fn word_freq_for_class(&self, word: &str, class: &[u8]) -> Result<usize> {
        let mut any_field = BooleanQuery::new();
        for field in &self.text_fields {
            any_field = any_field.should(Box::new(TermQuery::new(field.as_str(), word)));
        }
        let query = self
            .restricted(Box::new(any_field))
            .must(Box::new(TermQuery::new(self.class_field.as_str(), class)));
        self.searcher.count(&query)
    }
}

/// Naive Bayes that runs count queries against the index for every probe.
#[derive(Default)]
pub struct SimpleNaiveBayesClassifier {
    model: Option<SimpleModel>,
}

impl SimpleNaiveBayesClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for SimpleNaiveBayesClassifier {
    fn train(
        &mut self,
        reader: &LeafReader,
        text_fields: &[String],
        class_field: &str,
        analyzer: Arc<dyn Analyzer>,
        query: Option<Box<dyn Query>>,
    ) -> Result<()> {
        let mut model = SimpleModel {
            searcher: IndexSearcher::new(reader.clone()),
            text_fields: text_fields.to_vec(),
            class_field: class_field.to_string(),
            analyzer,
            query,
            docs_with_class: 0,
            avg_unique_terms: avg_unique_terms(reader, text_fields),
        };
        model.docs_with_class = model
            .searcher
            .count(&model.restricted(Box::new(WildcardQuery::new(class_field, "*")?)))?;
        debug!(
            "trained simple naive bayes on [{class_field}]: {} documents with a class",
            model.docs_with_class
        );
        self.model = Some(model);
        Ok(())
    }

    fn get_classes(&self, text: &str, max: usize) -> Result<Vec<ClassificationResult<ClassKey>>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        let Some(classes) = model.searcher.reader().terms(&model.class_field) else {
            return Ok(Vec::new());
        };
        let tokens = tokenize(model.analyzer.as_ref(), &model.text_fields, text)?;

        let mut scored = Vec::new();
        for (class, _) in classes.iter() {
            if class.is_empty() {
                continue;
            }
            let docs = model.class_doc_count(class)?;
            if docs == 0 {
                continue;
            }
            let prior = (docs as f64).ln() - (model.docs_with_class as f64).ln();
            let class_term_freq = model.avg_unique_terms * docs as f64;
            let mut likelihood = 0.0;
            for word in &tokens {
                let hits = model.word_freq_for_class(word, class)?;
                likelihood += word_probability(hits, class_term_freq, model.docs_with_class).ln();
            }
            scored.push(ClassificationResult::new(
                ClassKey::Term(class.to_vec()),
                prior + likelihood,
            ));
        }

        let mut results = normalize(scored);
        results.truncate(max);
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "simple_naive_bayes"
    }
}

impl fmt::Debug for SimpleNaiveBayesClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNaiveBayesClassifier")
            .field("trained", &self.model.is_some())
            .finish()
    }
}

struct CachedClass {
    term: Vec<u8>,
    doc_count: usize,
    term_freq: f64,
}

struct CachingModel {
    text_fields: Vec<String>,
    analyzer: Arc<dyn Analyzer>,
    classes: Vec<CachedClass>,
    docs_with_class: usize,
    /// word -> hits per class, indexed like `classes`.
    hits: AHashMap<Vec<u8>, Vec<usize>>,
}

/// Naive Bayes that precomputes word/class hit counts at training time.
///
/// Produces the same scores as [`SimpleNaiveBayesClassifier`].
#[derive(Default)]
pub struct CachingNaiveBayesClassifier {
    model: Option<CachingModel>,
}

impl CachingNaiveBayesClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct words with cached counts.
    pub fn cached_words(&self) -> usize {
        self.model.as_ref().map(|m| m.hits.len()).unwrap_or(0)
    }
}

impl Classifier for CachingNaiveBayesClassifier {
    fn train(
        &mut self,
        reader: &LeafReader,
        text_fields: &[String],
        class_field: &str,
        analyzer: Arc<dyn Analyzer>,
        query: Option<Box<dyn Query>>,
    ) -> Result<()> {
        let searcher = IndexSearcher::new(reader.clone());
        let filter = match &query {
            Some(query) => searcher.filter_bits(query.as_ref())?,
            None => BitVec::from_elem(reader.max_doc() as usize, true),
        };

        let avg_unique_terms = avg_unique_terms(reader, text_fields);
        let mut classes = Vec::new();
        let mut doc_classes: Vec<Vec<usize>> = vec![Vec::new(); reader.max_doc() as usize];
        let mut with_class = BitVec::from_elem(reader.max_doc() as usize, false);

        if let Some(terms) = reader.terms(class_field) {
            for (term, _) in terms.iter() {
                if term.is_empty() {
                    continue;
                }
                let docs: Vec<DocId> = reader
                    .postings(class_field, term)
                    .into_iter()
                    .map(|p| p.doc)
                    .filter(|&doc| filter.get(doc as usize).unwrap_or(false))
                    .collect();
                if docs.is_empty() {
                    continue;
                }
                let index = classes.len();
                for &doc in &docs {
                    doc_classes[doc as usize].push(index);
                    with_class.set(doc as usize, true);
                }
                classes.push(CachedClass {
                    term: term.to_vec(),
                    doc_count: docs.len(),
                    term_freq: avg_unique_terms * docs.len() as f64,
                });
            }
        }

        let mut words: BTreeSet<Vec<u8>> = BTreeSet::new();
        for field in text_fields {
            if let Some(terms) = reader.terms(field) {
                words.extend(terms.iter().map(|(term, _)| term.to_vec()));
            }
        }

        let mut hits = AHashMap::with_capacity(words.len());
        for word in words {
            let docs: BTreeSet<DocId> = text_fields
                .iter()
                .flat_map(|field| reader.postings(field, &word))
                .map(|p| p.doc)
                .collect();
            let mut counts = vec![0usize; classes.len()];
            for doc in docs {
                for &class in &doc_classes[doc as usize] {
                    counts[class] += 1;
                }
            }
            if counts.iter().any(|&c| c > 0) {
                hits.insert(word, counts);
            }
        }

        let docs_with_class = with_class.iter().filter(|&set| set).count();
        debug!(
            "trained caching naive bayes on [{class_field}]: {} classes, {} cached words",
            classes.len(),
            hits.len()
        );
        self.model = Some(CachingModel {
            text_fields: text_fields.to_vec(),
            analyzer,
            classes,
            docs_with_class,
            hits,
        });
        Ok(())
    }

    fn get_classes(&self, text: &str, max: usize) -> Result<Vec<ClassificationResult<ClassKey>>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        let tokens = tokenize(model.analyzer.as_ref(), &model.text_fields, text)?;

        let scored = model
            .classes
            .iter()
            .enumerate()
            .map(|(index, class)| {
                let prior = (class.doc_count as f64).ln() - (model.docs_with_class as f64).ln();
                let likelihood: f64 = tokens
                    .iter()
                    .map(|word| {
                        let hits = model
                            .hits
                            .get(word.as_bytes())
                            .map(|counts| counts[index])
                            .unwrap_or(0);
                        word_probability(hits, class.term_freq, model.docs_with_class).ln()
                    })
                    .sum();
                ClassificationResult::new(ClassKey::Term(class.term.clone()), prior + likelihood)
            })
            .collect();

        let mut results = normalize(scored);
        results.truncate(max);
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "caching_naive_bayes"
    }
}

impl fmt::Debug for CachingNaiveBayesClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingNaiveBayesClassifier")
            .field("trained", &self.model.is_some())
            .field("cached_words", &self.cached_words())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisRegistry;
    use crate::error::ErrorKind;
    use crate::schema::{FieldKind, FieldMapping, Schema, TypeMapping};
    use crate::test_support::index_documents;
    use serde_json::json;

    fn reader() -> LeafReader {
        let schema = Schema::new().with_type(
            "doc",
            TypeMapping::new()
                .field("subject", FieldMapping::new(FieldKind::Text))
                .field("body", FieldMapping::new(FieldKind::Text))
                .field("label", FieldMapping::new(FieldKind::Keyword))
                .field("lang", FieldMapping::new(FieldKind::Keyword)),
        );
        index_documents(
            schema,
            vec![
                json!({"subject": "cheap pills", "body": "buy cheap pills now", "label": "spam", "lang": "en"}),
                json!({"subject": "win money", "body": "win cheap money fast", "label": "spam", "lang": "en"}),
                json!({"subject": "meeting", "body": "team meeting notes attached", "label": "ham", "lang": "en"}),
                json!({"subject": "lunch", "body": "lunch with the team", "label": "ham", "lang": "en"}),
                json!({"subject": "reunion", "body": "notas de la reunion", "label": "ham", "lang": "es"}),
                json!({"subject": "no label", "body": "cheap team"}),
            ],
        )
    }

    fn analyzer() -> Arc<dyn Analyzer> {
        AnalysisRegistry::new().unwrap().default_analyzer().unwrap()
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn classes(results: &[ClassificationResult<ClassKey>]) -> Vec<ClassKey> {
        results.iter().map(|r| r.assigned_class.clone()).collect()
    }

    #[test]
    fn test_simple_naive_bayes_scores() {
        let reader = reader();
        let mut classifier = SimpleNaiveBayesClassifier::new();
        classifier
            .train(&reader, &fields(&["body"]), "label", analyzer(), None)
            .unwrap();

        let results = classifier.get_classes("cheap money", 10).unwrap();
        assert_eq!(
            classes(&results),
            vec![ClassKey::Term(b"spam".to_vec()), ClassKey::Term(b"ham".to_vec())]
        );
        let total: f64 = results.iter().map(|r| r.score).sum();
        assert!((total - 1.0).abs() < 1e-9);

        // Hand computed: docsWithClass 5, avg unique terms 20/6.
        let avg: f64 = 20.0 / 6.0;
        let spam = (2.0f64 / 5.0).ln() + (3.0 / (avg * 2.0 + 5.0)).ln() + (2.0 / (avg * 2.0 + 5.0)).ln();
        let ham = (3.0f64 / 5.0).ln() + (1.0 / (avg * 3.0 + 5.0)).ln() + (1.0 / (avg * 3.0 + 5.0)).ln();
        let expected_spam = 1.0 / (1.0 + (ham - spam).exp());
        assert!((results[0].score - expected_spam).abs() < 1e-9);

        assert_eq!(classifier.get_classes("team meeting", 1).unwrap().len(), 1);
        assert_eq!(
            classifier.assign_class("team meeting").unwrap().unwrap().assigned_class,
            ClassKey::Term(b"ham".to_vec())
        );
    }

    #[test]
    fn test_caching_matches_simple() {
        let reader = reader();
        let text_fields = fields(&["subject", "body"]);
        let filter: Box<dyn Query> = Box::new(TermQuery::new("lang", "en"));

        let mut simple = SimpleNaiveBayesClassifier::new();
        simple
            .train(&reader, &text_fields, "label", analyzer(), Some(filter.clone()))
            .unwrap();
        let mut caching = CachingNaiveBayesClassifier::new();
        caching
            .train(&reader, &text_fields, "label", analyzer(), Some(filter))
            .unwrap();
        assert!(caching.cached_words() > 0);

        for probe in ["cheap pills", "team lunch", "reunion", "unseen words only", ""] {
            let a = simple.get_classes(probe, 5).unwrap();
            let b = caching.get_classes(probe, 5).unwrap();
            assert_eq!(classes(&a), classes(&b), "probe {probe:?}");
            for (x, y) in a.iter().zip(&b) {
                assert!((x.score - y.score).abs() < 1e-9, "probe {probe:?}");
            }
        }
    }

    #[test]
    fn test_filter_excludes_classes_without_documents() {
        let reader = reader();
        let mut classifier = CachingNaiveBayesClassifier::new();
        classifier
            .train(
                &reader,
                &fields(&["body"]),
                "label",
                analyzer(),
                Some(Box::new(TermQuery::new("lang", "es"))),
            )
            .unwrap();
        let results = classifier.get_classes("cheap pills", 5).unwrap();
        assert_eq!(classes(&results), vec![ClassKey::Term(b"ham".to_vec())]);
        assert!((results[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_untrained_and_empty() {
        let err = SimpleNaiveBayesClassifier::new().get_classes("x", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
        assert!(CachingNaiveBayesClassifier::new().get_classes("x", 1).is_err());

        let mut classifier = SimpleNaiveBayesClassifier::new();
        classifier
            .train(&reader(), &fields(&["body"]), "missing", analyzer(), None)
            .unwrap();
        assert!(classifier.get_classes("cheap", 3).unwrap().is_empty());
    }
}
