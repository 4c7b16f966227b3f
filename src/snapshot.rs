use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::classifiers::naive_bayes::MultinomialNb;
use crate::vectorizer::CountVectorizer;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to save the snapshot: {0}")]
    SaveError(io::Error),

    #[error("Failed to load the snapshot: {0}")]
    LoadError(io::Error),

    #[error("Corrupt snapshot: {0}")]
    SerializationError(#[from] serde_json::Error),
}

fn default_alpha() -> f64 {
    1.0
}

/// The complete persisted state of a trained pipeline.
///
/// This is the only shape ever written to or read from storage: primitive
/// data only (numbers, strings, maps, sequences), so loading a snapshot can
/// never execute embedded state. The working representations of the
/// vectorizer and classifier are converted to and from this struct and are
/// never persisted directly. Fields missing from older snapshots fall back
/// to defaults on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    #[serde(default)]
    pub vocabulary: BTreeMap<String, usize>,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub class_count: BTreeMap<String, u64>,
    #[serde(default)]
    pub feature_count: BTreeMap<String, BTreeMap<usize, u64>>,
    #[serde(default)]
    pub class_log_prior: BTreeMap<String, f64>,
    #[serde(default)]
    pub feature_log_prob: BTreeMap<String, BTreeMap<usize, f64>>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub n_features: usize,
}

impl PipelineSnapshot {
    /// Copy the exposed state of a trained pair into primitive form.
    pub fn capture(vectorizer: &CountVectorizer, model: &MultinomialNb) -> Self {
        PipelineSnapshot {
            vocabulary: vectorizer
                .vocabulary()
                .iter()
                .map(|(token, &idx)| (token.clone(), idx))
                .collect(),
            alpha: model.alpha,
            class_count: model.class_count.clone(),
            feature_count: model.feature_count.clone(),
            class_log_prior: model.class_log_prior.clone(),
            feature_log_prob: model.feature_log_prob.clone(),
            classes: model.classes.clone(),
            n_features: model.n_features,
        }
    }

    /// Rebuild the working pair. The inverse of `capture`.
    pub fn restore(self) -> (CountVectorizer, MultinomialNb) {
        let vocabulary: HashMap<String, usize> = self.vocabulary.into_iter().collect();
        let vectorizer = CountVectorizer::from_vocabulary(vocabulary);
        let model = MultinomialNb {
            alpha: self.alpha,
            class_count: self.class_count,
            feature_count: self.feature_count,
            class_log_prior: self.class_log_prior,
            feature_log_prob: self.feature_log_prob,
            classes: self.classes,
            n_features: self.n_features,
        };
        (vectorizer, model)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a snapshot from bytes, atomically: malformed or truncated input
    /// fails as a whole, never as a partial recovery.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Write the snapshot to a temporary file in the target directory, flush
    /// it fully, then atomically rename it over `path`. A concurrent reader
    /// sees either the complete old snapshot or the complete new one, never a
    /// torn intermediate state.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(SnapshotError::SaveError)?;

        let tmp = NamedTempFile::new_in(parent).map_err(SnapshotError::SaveError)?;
        let mut writer = BufWriter::new(&tmp);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(SnapshotError::SaveError)?;
        drop(writer);
        tmp.as_file().sync_all().map_err(SnapshotError::SaveError)?;
        tmp.persist(path).map_err(|e| SnapshotError::SaveError(e.error))?;

        info!(path = %path.display(), "snapshot written");
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let file = File::open(path).map_err(SnapshotError::LoadError)?;
        let reader = BufReader::new(file);
        let snapshot = serde_json::from_reader(reader)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::SparseVector;

    fn trained_pair() -> (CountVectorizer, MultinomialNb) {
        let texts = [
            "win money now",
            "hello friend",
            "free win cash",
            "meeting at noon",
        ];
        let labels = vec![
            "spam".to_string(),
            "ham".to_string(),
            "spam".to_string(),
            "ham".to_string(),
        ];
        let mut vectorizer = CountVectorizer::new(1);
        let vectors = vectorizer.fit_transform(&texts);
        let mut model = MultinomialNb::new(1.0);
        model.fit(&vectors, &labels).unwrap();
        (vectorizer, model)
    }

    #[test]
    fn round_trip_reproduces_predictions() {
        let (vectorizer, model) = trained_pair();
        let snapshot = PipelineSnapshot::capture(&vectorizer, &model);
        let bytes = snapshot.to_bytes().unwrap();
        let (loaded_vec, loaded_model) = PipelineSnapshot::from_bytes(&bytes).unwrap().restore();

        assert_eq!(loaded_vec.vocabulary(), vectorizer.vocabulary());
        for text in ["free cash win", "meeting at noon", "xyzabc123qqq", ""] {
            let before = model.predict(&vectorizer.transform_one(text)).unwrap();
            let after = loaded_model.predict(&loaded_vec.transform_one(text)).unwrap();
            assert_eq!(before, after, "prediction diverged for {text:?}");

            let p_before = model.predict_proba(&vectorizer.transform_one(text)).unwrap();
            let p_after = loaded_model
                .predict_proba(&loaded_vec.transform_one(text))
                .unwrap();
            for (class, p) in &p_before {
                assert!((p - p_after[class]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn file_round_trip_is_atomic_replace() {
        let (vectorizer, model) = trained_pair();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let snapshot = PipelineSnapshot::capture(&vectorizer, &model);
        snapshot.save_to_file(&path).unwrap();
        // a second save replaces the file in place
        snapshot.save_to_file(&path).unwrap();

        let loaded = PipelineSnapshot::load_from_file(&path).unwrap();
        assert_eq!(loaded.classes, vec!["ham".to_string(), "spam".to_string()]);
        assert_eq!(loaded.n_features, 10);
        assert_eq!(loaded.vocabulary.len(), 10);
    }

    #[test]
    fn missing_fields_default_on_load() {
        let snapshot = PipelineSnapshot::from_bytes(b"{\"vocabulary\":{\"free\":0}}").unwrap();
        assert_eq!(snapshot.alpha, 1.0);
        assert!(snapshot.class_count.is_empty());
        assert!(snapshot.feature_count.is_empty());
        assert!(snapshot.classes.is_empty());
        assert_eq!(snapshot.n_features, 0);

        // restoring an empty model is fine; predicting with it is NotTrained
        let (vectorizer, model) = snapshot.restore();
        assert_eq!(vectorizer.vocabulary()["free"], 0);
        assert!(model.predict(&Default::default()).is_err());
    }

    #[test]
    fn corrupt_bytes_are_rejected_as_a_whole() {
        assert!(matches!(
            PipelineSnapshot::from_bytes(b"not json at all").unwrap_err(),
            SnapshotError::SerializationError(_)
        ));
        // truncated object
        assert!(PipelineSnapshot::from_bytes(b"{\"vocabulary\":{\"a\":0}").is_err());
        // schema violation: wrong type for a field
        assert!(PipelineSnapshot::from_bytes(b"{\"alpha\":\"high\"}").is_err());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineSnapshot::load_from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::LoadError(_)));
    }

    #[test]
    fn empty_vocabulary_model_round_trips() {
        // min_df high enough that every token is dropped
        let texts = ["one two", "three four"];
        let labels = vec!["spam".to_string(), "ham".to_string()];
        let mut vectorizer = CountVectorizer::new(10);
        let vectors = vectorizer.fit_transform(&texts);
        assert!(vectors.iter().all(SparseVector::is_empty));

        let mut model = MultinomialNb::new(1.0);
        model.fit(&vectors, &labels).unwrap();

        let bytes = PipelineSnapshot::capture(&vectorizer, &model)
            .to_bytes()
            .unwrap();
        let (loaded_vec, loaded_model) = PipelineSnapshot::from_bytes(&bytes).unwrap().restore();

        assert_eq!(loaded_vec.vocab_size(), 0);
        let probs = loaded_model
            .predict_proba(&loaded_vec.transform_one("free cash"))
            .unwrap();
        assert!((probs["spam"] - 0.5).abs() < 1e-12);
        assert!((probs["ham"] - 0.5).abs() < 1e-12);
    }
}
