use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::debug;

use crate::vectorizer::SparseVector;

#[derive(Error, Debug)]
pub enum NaiveBayesError {
    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("Degenerate smoothing: alpha = {alpha} over {n_features} features has no valid denominator")]
    DegenerateSmoothing { alpha: f64, n_features: usize },

    #[error("The classifier has not been trained")]
    NotTrained,
}

/// Multinomial Naive Bayes with additive (Laplace) smoothing.
///
/// All estimation and scoring happens in log-space. The feature index space
/// is fixed once at `fit` time to one past the highest index observed in the
/// training vectors; later vectors may exceed it (see `score_log_probs`).
#[derive(Debug, Clone)]
pub struct MultinomialNb {
    pub(crate) alpha: f64,
    pub(crate) class_count: BTreeMap<String, u64>,
    pub(crate) feature_count: BTreeMap<String, BTreeMap<usize, u64>>,
    pub(crate) class_log_prior: BTreeMap<String, f64>,
    pub(crate) feature_log_prob: BTreeMap<String, BTreeMap<usize, f64>>,
    pub(crate) classes: Vec<String>,
    pub(crate) n_features: usize,
}

impl MultinomialNb {
    /// Create an untrained classifier with the given smoothing constant.
    pub fn new(alpha: f64) -> Self {
        MultinomialNb {
            alpha,
            class_count: BTreeMap::new(),
            feature_count: BTreeMap::new(),
            class_log_prior: BTreeMap::new(),
            feature_log_prob: BTreeMap::new(),
            classes: Vec::new(),
            n_features: 0,
        }
    }

    /// Estimate priors and smoothed feature log-probabilities from vectorized
    /// training data. A failed fit leaves any previously trained parameters
    /// untouched.
    pub fn fit(&mut self, vectors: &[SparseVector], labels: &[String]) -> Result<(), NaiveBayesError> {
        if vectors.len() != labels.len() {
            return Err(NaiveBayesError::InvalidTrainingData(format!(
                "{} vectors against {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        if labels.is_empty() {
            return Err(NaiveBayesError::InvalidTrainingData(
                "zero training documents".to_string(),
            ));
        }

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();

        // The feature space sizes itself to the data actually seen, not to
        // the vectorizer's vocabulary.
        let n_features = vectors
            .iter()
            .filter_map(SparseVector::max_index)
            .max()
            .map_or(0, |max_idx| max_idx + 1);

        let pb = ProgressBar::new(vectors.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message("Training in progress...");

        // Count documents and feature occurrences per class
        let mut class_count: BTreeMap<String, u64> = BTreeMap::new();
        let mut feature_count: BTreeMap<String, BTreeMap<usize, u64>> = BTreeMap::new();
        for (vector, label) in vectors.iter().zip(labels) {
            *class_count.entry(label.clone()).or_insert(0) += 1;
            let counts = feature_count.entry(label.clone()).or_default();
            for (idx, count) in vector.iter() {
                *counts.entry(idx).or_insert(0) += count;
            }
            pb.inc(1);
        }
        pb.finish_with_message("Training complete");

        let total_docs = labels.len() as f64;
        let mut class_log_prior: BTreeMap<String, f64> = BTreeMap::new();
        let mut feature_log_prob: BTreeMap<String, BTreeMap<usize, f64>> = BTreeMap::new();

        for class in &classes {
            let doc_count = class_count.get(class).copied().unwrap_or(0) as f64;
            class_log_prior.insert(class.clone(), (doc_count / total_docs).ln());

            let counts = feature_count.get(class);
            let total_count: u64 = counts.map(|m| m.values().sum()).unwrap_or(0);
            let denom = total_count as f64 + self.alpha * n_features as f64;
            // alpha > 0 keeps every log finite; with an empty feature range no
            // logarithm is taken at all, so only a non-positive alpha can
            // produce an unusable denominator.
            if self.alpha <= 0.0 && denom <= 0.0 {
                return Err(NaiveBayesError::DegenerateSmoothing {
                    alpha: self.alpha,
                    n_features,
                });
            }

            let mut log_probs = BTreeMap::new();
            for idx in 0..n_features {
                let observed = counts.and_then(|m| m.get(&idx)).copied().unwrap_or(0) as f64;
                log_probs.insert(idx, ((observed + self.alpha) / denom).ln());
            }
            feature_log_prob.insert(class.clone(), log_probs);
        }

        // Commit only after every class computed cleanly
        self.class_count = class_count;
        self.feature_count = feature_count;
        self.class_log_prior = class_log_prior;
        self.feature_log_prob = feature_log_prob;
        self.classes = classes;
        self.n_features = n_features;

        debug!(
            classes = self.classes.len(),
            n_features = self.n_features,
            "classifier fitted"
        );
        Ok(())
    }

    /// Joint log-score per class for one vector: prior plus count-weighted
    /// feature log-probabilities. Indices at or beyond the fitted feature
    /// space fall back to a near-uniform smoothing term instead of erroring.
    pub fn score_log_probs(&self, vector: &SparseVector) -> Result<BTreeMap<String, f64>, NaiveBayesError> {
        self.ensure_trained()?;

        let mut scores = BTreeMap::new();
        for class in &self.classes {
            let mut score = self
                .class_log_prior
                .get(class)
                .copied()
                .unwrap_or(f64::NEG_INFINITY);

            let table = self.feature_log_prob.get(class);
            for (idx, count) in vector.iter() {
                let log_prob = if idx < self.n_features {
                    // Lookups never mutate; entries missing from a legacy
                    // table get the same value smoothing assigns a zero count
                    // over zero observed mass.
                    table.and_then(|t| t.get(&idx)).copied().unwrap_or_else(|| {
                        (self.alpha / (self.alpha * self.n_features as f64)).ln()
                    })
                } else {
                    // Feature unseen at fit time, e.g. the vocabulary grew
                    // after the snapshot was written.
                    (self.alpha / (self.alpha * (self.n_features as f64 + 1.0))).ln()
                };
                score += log_prob * count as f64;
            }
            scores.insert(class.clone(), score);
        }
        Ok(scores)
    }

    /// The class with the highest log-score. Ties resolve to the first class
    /// in ascending label order.
    pub fn predict(&self, vector: &SparseVector) -> Result<String, NaiveBayesError> {
        let scores = self.score_log_probs(vector)?;

        let mut best: Option<(&String, f64)> = None;
        for class in &self.classes {
            let score = scores.get(class).copied().unwrap_or(f64::NEG_INFINITY);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((class, score)),
            }
        }
        best.map(|(class, _)| class.clone())
            .ok_or(NaiveBayesError::NotTrained)
    }

    /// Posterior distribution over classes: numerically stable softmax over
    /// the joint log-scores (subtract the maximum before exponentiating).
    pub fn predict_proba(&self, vector: &SparseVector) -> Result<BTreeMap<String, f64>, NaiveBayesError> {
        let scores = self.score_log_probs(vector)?;

        let max_score = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut probs: BTreeMap<String, f64> = scores
            .into_iter()
            .map(|(class, score)| (class, (score - max_score).exp()))
            .collect();
        let sum: f64 = probs.values().sum();
        for p in probs.values_mut() {
            *p /= sum;
        }
        Ok(probs)
    }

    /// Row-independent batch predict.
    pub fn predict_batch(&self, vectors: &[SparseVector]) -> Result<Vec<String>, NaiveBayesError> {
        vectors.iter().map(|v| self.predict(v)).collect()
    }

    /// Row-independent batch predict_proba.
    pub fn predict_proba_batch(
        &self,
        vectors: &[SparseVector],
    ) -> Result<Vec<BTreeMap<String, f64>>, NaiveBayesError> {
        vectors.iter().map(|v| self.predict_proba(v)).collect()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Labels seen at fit time, sorted ascending.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn ensure_trained(&self) -> Result<(), NaiveBayesError> {
        if self.classes.is_empty() {
            return Err(NaiveBayesError::NotTrained);
        }
        Ok(())
    }
}
