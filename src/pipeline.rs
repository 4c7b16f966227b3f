use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::classifiers::naive_bayes::{MultinomialNb, NaiveBayesError};
use crate::snapshot::{PipelineSnapshot, SnapshotError};
use crate::vectorizer::CountVectorizer;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    NaiveBayes(#[from] NaiveBayesError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Predicted label plus the posterior distribution over every class seen at
/// training time.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: String,
    pub probabilities: BTreeMap<String, f64>,
}

/// A trained (vectorizer, classifier) pair behind one facade: raw text in,
/// label and distribution out.
#[derive(Debug, Clone)]
pub struct Pipeline {
    vectorizer: CountVectorizer,
    model: MultinomialNb,
}

impl Pipeline {
    /// Fit the vocabulary and the classifier on parallel text/label slices.
    pub fn train<T: AsRef<str>>(
        texts: &[T],
        labels: &[String],
        alpha: f64,
        min_df: usize,
    ) -> Result<Self, PipelineError> {
        let mut vectorizer = CountVectorizer::new(min_df);
        let vectors = vectorizer.fit_transform(texts);
        let mut model = MultinomialNb::new(alpha);
        model.fit(&vectors, labels)?;

        info!(
            documents = labels.len(),
            vocab_size = vectorizer.vocab_size(),
            classes = model.classes().len(),
            "pipeline trained"
        );
        Ok(Pipeline { vectorizer, model })
    }

    pub fn predict(&self, text: &str) -> Result<Prediction, PipelineError> {
        let vector = self.vectorizer.transform_one(text);
        let label = self.model.predict(&vector)?;
        let probabilities = self.model.predict_proba(&vector)?;
        Ok(Prediction {
            label,
            probabilities,
        })
    }

    pub fn predict_batch<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<Prediction>, PipelineError> {
        texts.iter().map(|text| self.predict(text.as_ref())).collect()
    }

    /// Share of correct predictions over a labeled set.
    pub fn evaluate<T: AsRef<str>>(&self, texts: &[T], labels: &[String]) -> Result<f64, PipelineError> {
        if texts.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (text, label) in texts.iter().zip(labels) {
            if self.predict(text.as_ref())?.label == *label {
                correct += 1;
            }
        }
        Ok(correct as f64 / texts.len() as f64)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        PipelineSnapshot::capture(&self.vectorizer, &self.model).save_to_file(path)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let (vectorizer, model) = PipelineSnapshot::load_from_file(path)?.restore();
        Ok(Pipeline { vectorizer, model })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let (vectorizer, model) = PipelineSnapshot::from_bytes(bytes)?.restore();
        Ok(Pipeline { vectorizer, model })
    }

    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    pub fn vectorizer(&self) -> &CountVectorizer {
        &self.vectorizer
    }

    pub fn model(&self) -> &MultinomialNb {
        &self.model
    }
}
