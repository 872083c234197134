//! Topic modeling with non-negative matrix factorization.
//!
//! The TF-IDF matrix `V` of a [`Corpus`] is factorized as `V ≈ W·H` with the
//! multiplicative update rules of Lee and Seung. `W` becomes the
//! document-to-topic matrix, with every non-zero row normalized to sum to 1,
//! and `H` the topic-to-token matrix.
//!
//! ```
//! use litreview::corpus::{Corpus, CorpusConfig};
//! use litreview::topic::{NmfConfig, train_nmf_model};
//! use litreview::Document;
//!
//! let docs: Vec<Document> = ["travel demand", "travel survey", "traffic signal", "traffic flow"]
//!     .iter()
//!     .map(|t| Document { title: t.to_string(), ..Default::default() })
//!     .collect();
//! let config = CorpusConfig { min_docs: 1, max_doc_ratio: 1.0, ..Default::default() };
//! let corpus = Corpus::build(&docs, &config).unwrap();
//! let nmf = NmfConfig { num_topics: 2, ..Default::default() };
//! let model = train_nmf_model(&corpus, &nmf).unwrap();
//! assert_eq!(model.doc2topic().dim(), (4, 2));
//! ```

use crate::corpus::Corpus;
use compact_str::CompactString;
use itertools::Itertools;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

const EPSILON: f64 = 1e-10;

/// Error types for topic modeling
#[derive(Debug, Error)]
pub enum TopicError {
    #[error("Number of topics must be positive")]
    NoTopics,

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Factorization diverged after {0} iterations")]
    Diverged(usize),
}

/// NMF training parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NmfConfig {
    pub num_topics: usize,
    pub max_iter: usize,
    /// Relative decrease of the reconstruction error below which training stops
    pub tolerance: f64,
    /// Seed of the random initialization
    pub seed: u64,
}

impl Default for NmfConfig {
    fn default() -> Self {
        Self {
            num_topics: 10,
            max_iter: 250,
            tolerance: 1e-4,
            seed: 0,
        }
    }
}

/// A fitted topic model.
#[derive(Debug, Clone)]
pub struct TopicModel {
    /// documents x topics, rows sum to 1 (or are all zero)
    doc2topic: Array2<f64>,
    /// topics x tokens
    topic2token: Array2<f64>,
    vocabulary: Vec<CompactString>,
    index: HashMap<CompactString, usize>,
}

impl TopicModel {
    /// Assembles a model from its matrices; `doc2topic` rows are normalized.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::ShapeMismatch` when the dimensions disagree.
    pub fn new(
        doc2topic: Array2<f64>,
        topic2token: Array2<f64>,
        vocabulary: Vec<CompactString>,
    ) -> Result<Self, TopicError> {
        if doc2topic.ncols() != topic2token.nrows() {
            return Err(TopicError::ShapeMismatch(format!(
                "{} topics in doc2topic, {} in topic2token",
                doc2topic.ncols(),
                topic2token.nrows()
            )));
        }
        if topic2token.ncols() != vocabulary.len() {
            return Err(TopicError::ShapeMismatch(format!(
                "{} token columns for a vocabulary of {}",
                topic2token.ncols(),
                vocabulary.len()
            )));
        }
        if doc2topic.ncols() == 0 {
            return Err(TopicError::NoTopics);
        }

        let index = vocabulary
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();

        Ok(Self {
            doc2topic: normalize_rows(doc2topic),
            topic2token,
            vocabulary,
            index,
        })
    }

    pub fn num_topics(&self) -> usize {
        self.topic2token.nrows()
    }

    pub fn num_documents(&self) -> usize {
        self.doc2topic.nrows()
    }

    pub fn doc2topic(&self) -> &Array2<f64> {
        &self.doc2topic
    }

    pub fn topic2token(&self) -> &Array2<f64> {
        &self.topic2token
    }

    /// Topic giving `token` its highest weight, or `None` for a token outside
    /// the vocabulary.
    pub fn best_topic_for_token(&self, token: &str) -> Option<usize> {
        let column = *self.index.get(&CompactString::from(token.to_lowercase()))?;
        argmax(self.topic2token.column(column).iter().copied())
    }

    /// Topic for a keyword, falling back to topic 0 for unknown keywords.
    pub fn topic_for_keyword(&self, keyword: &str) -> usize {
        match self.best_topic_for_token(keyword) {
            Some(topic) => topic,
            None => {
                warn!(
                    "Keyword '{}' is not in the vocabulary, falling back to topic 0",
                    keyword
                );
                0
            }
        }
    }

    /// The `limit` heaviest tokens of `topic`, heaviest first.
    pub fn best_tokens_for_topic(&self, topic: usize, limit: usize) -> Vec<(CompactString, f64)> {
        if topic >= self.num_topics() {
            return Vec::new();
        }
        self.topic2token
            .row(topic)
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, weight)| weight > 0.0)
            .sorted_by(|(i, a), (j, b)| b.total_cmp(a).then(i.cmp(j)))
            .take(limit)
            .map(|(i, weight)| (self.vocabulary[i].clone(), weight))
            .collect()
    }

    /// Indices of the `limit` documents with the highest weight for `topic`.
    pub fn best_documents_for_topic(&self, topic: usize, limit: usize) -> Vec<(usize, f64)> {
        if topic >= self.num_topics() {
            return Vec::new();
        }
        self.doc2topic
            .column(topic)
            .iter()
            .copied()
            .enumerate()
            .sorted_by(|(i, a), (j, b)| b.total_cmp(a).then(i.cmp(j)))
            .take(limit)
            .collect()
    }

    /// Topic with the highest weight for each document.
    pub fn dominant_topics(&self) -> Vec<usize> {
        self.doc2topic
            .rows()
            .into_iter()
            .map(|row| argmax(row.iter().copied()).unwrap_or(0))
            .collect()
    }

    /// Whether each document's weight for `topic` is strictly above
    /// `threshold`.
    pub fn relevance(&self, topic: usize, threshold: f64) -> Vec<bool> {
        if topic >= self.num_topics() {
            return vec![false; self.num_documents()];
        }
        self.doc2topic
            .column(topic)
            .iter()
            .map(|&weight| weight > threshold)
            .collect()
    }
}

/// Fits an NMF topic model over the TF-IDF weights of `corpus`.
///
/// # Errors
///
/// Returns an error for a zero topic count or when the factorization produces
/// non-finite values.
pub fn train_nmf_model(corpus: &Corpus, config: &NmfConfig) -> Result<TopicModel, TopicError> {
    if config.num_topics == 0 {
        return Err(TopicError::NoTopics);
    }

    let v = corpus.tfidf();
    let (n, m) = v.dim();
    let k = config.num_topics;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let scale = (v.mean().unwrap_or(0.0) / k as f64).sqrt().max(EPSILON);
    let mut w = Array2::from_shape_simple_fn((n, k), || rng.r#gen::<f64>() * scale);
    let mut h = Array2::from_shape_simple_fn((k, m), || rng.r#gen::<f64>() * scale);

    let initial_error = reconstruction_error(&v, &w, &h).max(EPSILON);
    let mut previous_error = initial_error;

    for iteration in 1..=config.max_iter {
        let numerator = w.t().dot(&v);
        let denominator = w.t().dot(&w).dot(&h) + EPSILON;
        h = h * numerator / denominator;

        let numerator = v.dot(&h.t());
        let denominator = w.dot(&h.dot(&h.t())) + EPSILON;
        w = w * numerator / denominator;

        if iteration % 10 == 0 || iteration == config.max_iter {
            let error = reconstruction_error(&v, &w, &h);
            if !error.is_finite() {
                return Err(TopicError::Diverged(iteration));
            }
            if (previous_error - error) / initial_error < config.tolerance {
                debug!("NMF converged after {} iterations (error {:.6})", iteration, error);
                break;
            }
            previous_error = error;
        }
    }

    TopicModel::new(w, h, corpus.vocabulary().to_vec())
}

/// Two-dimensional PCA projection of the rows of `data`.
///
/// Principal axes are found by power iteration on the covariance matrix; an
/// axis without variance projects to zero.
pub fn project_2d(data: &Array2<f64>) -> Array2<f64> {
    let (n, d) = data.dim();
    if n == 0 || d == 0 {
        return Array2::zeros((n, 2));
    }

    let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
    let centered = data - &mean;
    let mut covariance = centered.t().dot(&centered) / (n.max(2) - 1) as f64;

    let mut projection = Array2::zeros((n, 2));
    for component in 0..2.min(d) {
        let Some((eigenvalue, axis)) = dominant_eigenvector(&covariance) else {
            break;
        };
        projection
            .column_mut(component)
            .assign(&centered.dot(&axis));
        let outer = axis
            .view()
            .insert_axis(Axis(1))
            .dot(&axis.view().insert_axis(Axis(0)));
        covariance = covariance - outer * eigenvalue;
    }
    projection
}

fn dominant_eigenvector(matrix: &Array2<f64>) -> Option<(f64, Array1<f64>)> {
    let d = matrix.nrows();
    let mut vector = Array1::from_shape_fn(d, |i| 1.0 + i as f64);
    let norm = vector.dot(&vector).sqrt();
    vector /= norm;

    for _ in 0..200 {
        let next = matrix.dot(&vector);
        let norm = next.dot(&next).sqrt();
        if norm < 1e-12 {
            return None;
        }
        vector = next / norm;
    }

    let eigenvalue = vector.dot(&matrix.dot(&vector));
    (eigenvalue > 1e-12).then_some((eigenvalue, vector))
}

fn reconstruction_error(v: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
    (v - &w.dot(h)).mapv(|x| x * x).sum().sqrt()
}

fn normalize_rows(mut matrix: Array2<f64>) -> Array2<f64> {
    for mut row in matrix.rows_mut() {
        let sum = row.sum();
        if sum > 0.0 {
            row /= sum;
        }
    }
    matrix
}

fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((i, value)),
        })
        .map(|(i, _)| i)
}
