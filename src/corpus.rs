use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to read the corpus: {0}")]
    Csv(#[from] csv::Error),
}

/// One labeled training message, as stored in the CSV corpus.
#[derive(Debug, Clone, Deserialize)]
pub struct LabeledMessage {
    pub label: String,
    pub text: String,
}

/// Load (texts, labels) from a `label,text` headered CSV, keeping at most
/// `limit` rows when one is given. Row order is preserved.
pub fn load_csv<P: AsRef<Path>>(
    path: P,
    limit: Option<usize>,
) -> Result<(Vec<String>, Vec<String>), CorpusError> {
    let mut reader = csv::Reader::from_path(path)?;

    let mut texts = Vec::new();
    let mut labels = Vec::new();
    for result in reader.deserialize() {
        if limit.is_some_and(|n| texts.len() >= n) {
            break;
        }
        let record: LabeledMessage = result?;
        texts.push(record.text);
        labels.push(record.label);
    }

    info!(rows = texts.len(), "corpus loaded");
    Ok((texts, labels))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_sample(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("sample.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "label,text").unwrap();
        writeln!(file, "spam,win money now").unwrap();
        writeln!(file, "ham,hello friend").unwrap();
        writeln!(file, "spam,\"free, free cash\"").unwrap();
        path
    }

    #[test]
    fn loads_parallel_texts_and_labels_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (texts, labels) = load_csv(write_sample(&dir), None).unwrap();

        assert_eq!(labels, vec!["spam", "ham", "spam"]);
        assert_eq!(texts[0], "win money now");
        // quoted field keeps its comma
        assert_eq!(texts[2], "free, free cash");
    }

    #[test]
    fn limit_caps_the_number_of_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (texts, labels) = load_csv(write_sample(&dir), Some(2)).unwrap();
        assert_eq!(texts.len(), 2);
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_csv(dir.path().join("absent.csv"), None).is_err());
    }

    #[test]
    fn malformed_rows_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "label,text").unwrap();
        writeln!(file, "only-one-column").unwrap();
        assert!(load_csv(&path, None).is_err());
    }
}
