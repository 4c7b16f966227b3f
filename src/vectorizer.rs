use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    // Maximal runs of lowercase alphanumerics; everything else is a separator.
    static ref TOKEN_RE: Regex = Regex::new(r"[a-z0-9]+").unwrap();
}

/// Tokenizer: lowercases the input and extracts alphanumeric runs.
pub struct Tokenizer;

impl Tokenizer {
    /// Pure function: same input, same token sequence. Order and duplicates
    /// are preserved.
    pub fn tokenize(text: &str) -> Vec<String> {
        TOKEN_RE
            .find_iter(&text.to_lowercase())
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// One bag-of-words row: `(feature index, count)` pairs sorted by index.
/// Indices absent from the list are implicitly zero. Never mutated after
/// construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseVector {
    entries: Vec<(usize, u64)>,
}

impl SparseVector {
    pub fn from_counts(counts: HashMap<usize, u64>) -> Self {
        let mut entries: Vec<(usize, u64)> = counts.into_iter().collect();
        entries.sort_unstable_by_key(|&(idx, _)| idx);
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest feature index present, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.entries.last().map(|&(idx, _)| idx)
    }
}

/// Count vectorizer with a document-frequency cutoff.
///
/// `fit` learns a token -> index vocabulary; `transform` turns documents into
/// sparse count rows over that index space. The vocabulary is immutable
/// between fits.
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    min_df: usize,
    vocabulary: HashMap<String, usize>,
}

impl CountVectorizer {
    pub fn new(min_df: usize) -> Self {
        Self {
            min_df,
            vocabulary: HashMap::new(),
        }
    }

    /// Rebuild an already-fitted vectorizer from a persisted vocabulary.
    pub fn from_vocabulary(vocabulary: HashMap<String, usize>) -> Self {
        Self {
            min_df: 1,
            vocabulary,
        }
    }

    /// Learn the vocabulary from a corpus: tokens whose document frequency is
    /// at least `min_df`, indexed contiguously in first-seen order. Replaces
    /// any previously learned vocabulary.
    pub fn fit<T: AsRef<str>>(&mut self, documents: &[T]) {
        let mut df: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        for doc in documents {
            let mut seen_in_doc = HashSet::new();
            for token in Tokenizer::tokenize(doc.as_ref()) {
                // document frequency counts each document once per token
                if !seen_in_doc.insert(token.clone()) {
                    continue;
                }
                match df.entry(token) {
                    Entry::Occupied(mut e) => *e.get_mut() += 1,
                    Entry::Vacant(e) => {
                        order.push(e.key().clone());
                        e.insert(1);
                    }
                }
            }
        }

        let min_df = self.min_df;
        self.vocabulary = order
            .into_iter()
            .filter(|token| df[token] >= min_df)
            .enumerate()
            .map(|(idx, token)| (token, idx))
            .collect();

        debug!(
            vocab_size = self.vocabulary.len(),
            min_df = self.min_df,
            "vocabulary fitted"
        );
    }

    /// Count known tokens per document. Tokens outside the vocabulary are
    /// silently dropped: the classifier has no parameters for them.
    pub fn transform<T: AsRef<str>>(&self, documents: &[T]) -> Vec<SparseVector> {
        documents
            .iter()
            .map(|doc| self.transform_one(doc.as_ref()))
            .collect()
    }

    pub fn transform_one(&self, document: &str) -> SparseVector {
        let mut counts: HashMap<usize, u64> = HashMap::new();
        for token in Tokenizer::tokenize(document) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }
        SparseVector::from_counts(counts)
    }

    /// `fit` followed by `transform` on the same corpus.
    pub fn fit_transform<T: AsRef<str>>(&mut self, documents: &[T]) -> Vec<SparseVector> {
        self.fit(documents);
        self.transform(documents)
    }

    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocabulary
    }

    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }
}
