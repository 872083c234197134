//! Co-citation network construction.
//!
//! Two cited works are co-cited when one document references both. The
//! network has one node per cited work and one edge per co-cited pair, weighted
//! by the number of documents citing both.

use crate::Document;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Error types for network construction
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("No co-cited references in {0} documents")]
    Empty(usize),
}

/// A cited work in the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Identity key of the cited work (see [`crate::Reference::key`])
    pub key: String,
    /// Human readable label
    pub label: String,
    /// Sum of the weights of incident edges
    pub degree: usize,
}

/// An undirected weighted edge between two node indices, `source < target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: usize,
}

/// A co-citation graph.
#[derive(Debug, Clone, Default)]
pub struct CoCitationNetwork {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl CoCitationNetwork {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node indices ordered by descending degree, ties by key.
    pub fn nodes_by_degree(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .sorted_by(|&a, &b| {
                self.nodes[b]
                    .degree
                    .cmp(&self.nodes[a].degree)
                    .then_with(|| self.nodes[a].key.cmp(&self.nodes[b].key))
            })
            .collect()
    }
}

/// Builds the co-citation network of `documents`, keeping the `max_edges`
/// heaviest edges.
///
/// # Errors
///
/// Returns `NetworkError::Empty` when no document cites two distinct works.
pub fn build_cocitation_network<'a, I>(
    documents: I,
    max_edges: usize,
) -> Result<CoCitationNetwork, NetworkError>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut labels: HashMap<String, String> = HashMap::new();
    let mut weights: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut document_count = 0;

    for document in documents {
        document_count += 1;
        let keys: Vec<String> = document
            .references
            .iter()
            .filter_map(|reference| {
                let key = reference.key()?;
                labels.entry(key.clone()).or_insert_with(|| {
                    reference
                        .title
                        .clone()
                        .or_else(|| reference.doi.clone())
                        .unwrap_or_else(|| key.clone())
                });
                Some(key)
            })
            .sorted()
            .dedup()
            .collect();

        for (a, b) in keys.iter().tuple_combinations() {
            *weights.entry((a.clone(), b.clone())).or_default() += 1;
        }
    }

    // Heaviest first; the BTreeMap order breaks ties by key
    let kept: Vec<((String, String), usize)> = weights
        .into_iter()
        .sorted_by(|(ka, wa), (kb, wb)| wb.cmp(wa).then_with(|| ka.cmp(kb)))
        .take(max_edges)
        .collect();

    if kept.is_empty() {
        return Err(NetworkError::Empty(document_count));
    }

    let mut network = CoCitationNetwork::default();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut node_for = |key: &String, network: &mut CoCitationNetwork| -> usize {
        *index.entry(key.clone()).or_insert_with(|| {
            network.nodes.push(Node {
                key: key.clone(),
                label: labels.get(key).cloned().unwrap_or_else(|| key.clone()),
                degree: 0,
            });
            network.nodes.len() - 1
        })
    };

    for ((a, b), weight) in kept {
        let source = node_for(&a, &mut network);
        let target = node_for(&b, &mut network);
        network.nodes[source].degree += weight;
        network.nodes[target].degree += weight;
        network.edges.push(Edge {
            source: source.min(target),
            target: source.max(target),
            weight,
        });
    }

    Ok(network)
}
