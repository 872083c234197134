//! Bag-of-words corpus over document titles and abstracts.
//!
//! The corpus is the input of the topic model: a vocabulary and a dense
//! document-by-token count matrix. Tokens are Unicode words, lower-cased, with
//! English stop words, short words and numbers removed. Tokens that are too
//! rare or too common across documents are pruned.

use crate::Document;
use compact_str::CompactString;
use itertools::Itertools;
use ndarray::{Array1, Array2, Axis};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

/// English stop words removed during tokenization.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
    "any", "are", "as", "at", "based", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
    "during", "each", "et", "few", "for", "from", "further", "had", "has", "have", "having",
    "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however", "i",
    "if", "in", "into", "is", "it", "its", "itself", "just", "may", "me", "more", "most",
    "my", "myself", "new", "no", "nor", "not", "now", "of", "off", "on", "once", "one",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "paper",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "two", "under", "until", "up", "use", "used", "using", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "within", "would", "you", "your", "yours", "yourself", "yourselves",
];

/// Error types for corpus construction
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Cannot build a corpus from an empty collection")]
    NoDocuments,

    #[error("No token survived filtering ({documents} documents, min_docs={min_docs})")]
    EmptyVocabulary { documents: usize, min_docs: usize },
}

/// Token filtering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusConfig {
    /// Shortest token kept
    pub min_length: usize,
    /// Minimum number of documents a token must occur in; capped at the
    /// number of documents
    pub min_docs: usize,
    /// Maximum share of documents a token may occur in
    pub max_doc_ratio: f64,
    /// Vocabulary size limit, most frequent tokens first
    pub max_tokens: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            min_docs: 5,
            max_doc_ratio: 0.75,
            max_tokens: 5000,
        }
    }
}

/// A vocabulary and the document-by-token count matrix.
#[derive(Debug, Clone)]
pub struct Corpus {
    vocabulary: Vec<CompactString>,
    index: HashMap<CompactString, usize>,
    /// documents x tokens
    counts: Array2<f64>,
}

/// Splits text into lower-cased tokens, dropping stop words, numbers and
/// tokens shorter than `min_length` characters.
pub fn tokenize(text: &str, min_length: usize) -> Vec<CompactString> {
    static STOP_SET: std::sync::LazyLock<HashSet<&'static str>> =
        std::sync::LazyLock::new(|| STOP_WORDS.iter().copied().collect());

    text.unicode_words()
        .map(|word| CompactString::from(word.to_lowercase()))
        .filter(|word| word.chars().count() >= min_length)
        .filter(|word| !word.chars().all(|c| c.is_numeric() || c == '.' || c == ','))
        .filter(|word| !STOP_SET.contains(word.as_str()))
        .collect()
}

impl Corpus {
    /// Builds the corpus of `documents` over title and abstract text.
    ///
    /// # Errors
    ///
    /// Returns an error when there are no documents or no token survives
    /// filtering.
    pub fn build<'a, I>(documents: I, config: &CorpusConfig) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let tokenized: Vec<Vec<CompactString>> = documents
            .into_iter()
            .map(|doc| {
                let text = format!(
                    "{} {}",
                    doc.title,
                    doc.abstract_text.as_deref().unwrap_or_default()
                );
                tokenize(&text, config.min_length)
            })
            .collect();

        let num_documents = tokenized.len();
        if num_documents == 0 {
            return Err(CorpusError::NoDocuments);
        }

        let mut document_frequency: HashMap<&CompactString, usize> = HashMap::new();
        for tokens in &tokenized {
            for token in tokens.iter().unique() {
                *document_frequency.entry(token).or_default() += 1;
            }
        }

        let min_docs = config.min_docs.clamp(1, num_documents);
        let max_docs =
            ((config.max_doc_ratio * num_documents as f64).ceil() as usize).max(min_docs);

        let vocabulary: Vec<CompactString> = document_frequency
            .into_iter()
            .filter(|(_, df)| (min_docs..=max_docs).contains(df))
            .sorted_by(|(a, da), (b, db)| db.cmp(da).then_with(|| a.cmp(b)))
            .take(config.max_tokens)
            .map(|(token, _)| token.clone())
            .collect();

        if vocabulary.is_empty() {
            return Err(CorpusError::EmptyVocabulary {
                documents: num_documents,
                min_docs,
            });
        }

        let index: HashMap<CompactString, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();

        let mut counts = Array2::<f64>::zeros((num_documents, vocabulary.len()));
        for (row, tokens) in tokenized.iter().enumerate() {
            for token in tokens {
                if let Some(&column) = index.get(token) {
                    counts[[row, column]] += 1.0;
                }
            }
        }

        Ok(Self {
            vocabulary,
            index,
            counts,
        })
    }

    pub fn vocabulary(&self) -> &[CompactString] {
        &self.vocabulary
    }

    pub fn num_documents(&self) -> usize {
        self.counts.nrows()
    }

    pub fn num_tokens(&self) -> usize {
        self.vocabulary.len()
    }

    /// Raw token counts, documents x tokens.
    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    pub fn token_index(&self, token: &str) -> Option<usize> {
        self.index.get(&CompactString::from(token.to_lowercase())).copied()
    }

    /// Number of documents each vocabulary token occurs in.
    pub fn document_frequencies(&self) -> Array1<usize> {
        self.counts
            .map_axis(Axis(0), |column| column.iter().filter(|&&c| c > 0.0).count())
    }

    /// The `limit` tokens occurring in the most documents, most frequent first.
    pub fn word_distribution(&self, limit: usize) -> Vec<(CompactString, usize)> {
        let frequencies = self.document_frequencies();
        self.vocabulary
            .iter()
            .cloned()
            .zip(frequencies.iter().copied())
            .sorted_by(|(a, da), (b, db)| db.cmp(da).then_with(|| a.cmp(b)))
            .take(limit)
            .collect()
    }

    /// TF-IDF weights with smoothed idf and L2-normalized rows.
    pub fn tfidf(&self) -> Array2<f64> {
        let n = self.num_documents() as f64;
        let idf = self
            .document_frequencies()
            .mapv(|df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);

        let mut weights = &self.counts * &idf;
        for mut row in weights.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row /= norm;
            }
        }
        weights
    }
}
