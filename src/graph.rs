// De Bruijn graph construction

use clap::ValueEnum;
use log::{debug, trace};
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

use crate::{
    errors::AssemblerError,
    kmer::{check_ascii, normalize_sequence, KmerCounts, BASES},
};

/// How repeated observations of an edge are folded into its weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeWeightPolicy {
    /// Every observation adds the multiplicity of its k-mer, across all reads.
    #[default]
    Cumulative,
    /// The weight is the largest contribution seen from any single read.
    PerRead,
    /// Every distinct observed edge has weight 1.
    Constant,
}

/// One distinct k-mer and its weighted neighbourhood.
///
/// Neighbours are keyed by their k-mer string, never by node identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    sequence: String,
    count: usize,
    outgoing: BTreeMap<String, usize>,
    incoming: BTreeMap<String, usize>,
}

impl GraphNode {
    pub(crate) fn new(sequence: String) -> Self {
        GraphNode {
            sequence,
            count: 0,
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
        }
    }

    /// The k-mer this node stands for.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Total multiplicity of this k-mer over everything inserted so far.
    pub fn count(&self) -> usize {
        self.count
    }

    // Only `DeBruijnGraph::add_edge` may call these two, always as a pair.
    pub(crate) fn add_outgoing(&mut self, neighbor: &str, increment: usize) {
        *self.outgoing.entry(neighbor.to_string()).or_insert(0) += increment;
    }

    pub(crate) fn add_incoming(&mut self, neighbor: &str, increment: usize) {
        *self.incoming.entry(neighbor.to_string()).or_insert(0) += increment;
    }

    /// The four k-mers this node could overlap into: drop the first base,
    /// append each of A/C/G/T.
    pub fn potential_successors(&self) -> [String; 4] {
        let suffix = &self.sequence[1..];
        BASES.map(|base| {
            let mut kmer = String::with_capacity(self.sequence.len());
            kmer.push_str(suffix);
            kmer.push(base);
            kmer
        })
    }

    /// The four k-mers that could overlap into this node: drop the last base,
    /// prepend each of A/C/G/T.
    pub fn potential_predecessors(&self) -> [String; 4] {
        let prefix = &self.sequence[..self.sequence.len() - 1];
        BASES.map(|base| {
            let mut kmer = String::with_capacity(self.sequence.len());
            kmer.push(base);
            kmer.push_str(prefix);
            kmer
        })
    }

    pub fn edge_weight_to(&self, other: &str) -> usize {
        self.outgoing.get(other).copied().unwrap_or(0)
    }

    pub fn edge_weight_from(&self, other: &str) -> usize {
        self.incoming.get(other).copied().unwrap_or(0)
    }

    /// Number of distinct successors (not the sum of weights).
    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }

    /// Number of distinct predecessors (not the sum of weights).
    pub fn in_degree(&self) -> usize {
        self.incoming.len()
    }

    /// A node is an interior chain link when it has one successor and at most
    /// one predecessor.
    pub fn is_simple(&self) -> bool {
        self.out_degree() == 1 && self.in_degree() <= 1
    }

    /// Successors with their edge weights, in lexicographic order.
    pub fn successors(&self) -> impl Iterator<Item = (&str, usize)> {
        self.outgoing.iter().map(|(kmer, &w)| (kmer.as_str(), w))
    }

    /// Predecessors with their edge weights, in lexicographic order.
    pub fn predecessors(&self) -> impl Iterator<Item = (&str, usize)> {
        self.incoming.iter().map(|(kmer, &w)| (kmer.as_str(), w))
    }

    /// The only successor, if there is exactly one.
    pub(crate) fn sole_successor(&self) -> Option<&str> {
        if self.outgoing.len() == 1 {
            self.outgoing.keys().next().map(String::as_str)
        } else {
            None
        }
    }

    /// The only predecessor, if there is exactly one.
    pub(crate) fn sole_predecessor(&self) -> Option<&str> {
        if self.incoming.len() == 1 {
            self.incoming.keys().next().map(String::as_str)
        } else {
            None
        }
    }
}

/// A de Bruijn graph over k-mers of one fixed length.
///
/// Nodes live in a `BTreeMap` keyed by k-mer, so every walk over the graph
/// visits them in lexicographic order and output is reproducible.
#[derive(Debug, Clone, Default)]
pub struct DeBruijnGraph {
    k: Option<usize>,
    policy: EdgeWeightPolicy,
    nodes: BTreeMap<String, GraphNode>,
}

impl DeBruijnGraph {
    /// Creates an empty graph; `k` is fixed by the first non-empty insertion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph that only accepts k-mers of length `k`.
    pub fn with_k(k: usize) -> Result<Self, AssemblerError> {
        if k == 0 {
            return Err(AssemblerError::InvalidKmerSize(k));
        }
        Ok(DeBruijnGraph {
            k: Some(k),
            ..Self::default()
        })
    }

    pub fn with_policy(mut self, policy: EdgeWeightPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn k(&self) -> Option<usize> {
        self.k
    }

    pub fn policy(&self) -> EdgeWeightPolicy {
        self.policy
    }

    pub fn node(&self, kmer: &str) -> Option<&GraphNode> {
        self.nodes.get(kmer)
    }

    pub fn contains(&self, kmer: &str) -> bool {
        self.nodes.contains_key(kmer)
    }

    /// All nodes in lexicographic order of their k-mer.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// All edges as `(source, target, weight)`, ordered by source then target.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, usize)> {
        self.nodes.values().flat_map(|node| {
            node.successors()
                .map(move |(target, weight)| (node.sequence(), target, weight))
        })
    }

    pub fn count_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct directed edges, i.e. the sum of all out-degrees.
    pub fn count_edges(&self) -> usize {
        self.nodes.values().map(GraphNode::out_degree).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Merges one read's k-mer multiset into the graph.
    ///
    /// Keys are upper-cased and k-mers with a count of zero are ignored. The
    /// whole mapping is validated before anything is written: if any k-mer
    /// has the wrong length the graph is left exactly as it was.
    ///
    /// Each edge receives at most one contribution per call, carrying the
    /// multiplicity of the k-mer that was inserted:
    /// - `s -> t` for every inserted `s` whose successor `t` is in the graph
    ///   (including k-mers of this same call), weighted by `s`'s count;
    /// - `p -> s` for every inserted `s` whose predecessor `p` was already in
    ///   the graph and is not part of this call, weighted by `s`'s count.
    ///
    /// Edges towards k-mers that only arrive in a later call are added by that
    /// later call, from the new k-mer's side. Weights therefore depend on the
    /// order in which reads are loaded, although the topology does not.
    pub fn add_kmers(&mut self, counts: &KmerCounts) -> Result<(), AssemblerError> {
        let batch = self.validate_batch(counts)?;
        let Some((first, _)) = batch.first_key_value() else {
            return Ok(());
        };
        if self.k.is_none() {
            debug!("Fixing graph k-mer length to {}", first.len());
            self.k = Some(first.len());
        }

        let already_present = batch
            .keys()
            .filter(|kmer| self.nodes.contains_key(*kmer))
            .count();

        for (kmer, &count) in &batch {
            self.nodes
                .entry(kmer.clone())
                .or_insert_with(|| GraphNode::new(kmer.clone()))
                .count += count;
        }

        let mut contributions: BTreeMap<(String, String), usize> = BTreeMap::new();
        for (kmer, &count) in &batch {
            let node = &self.nodes[kmer];
            for succ in node.potential_successors() {
                if self.nodes.contains_key(&succ) {
                    *contributions.entry((kmer.clone(), succ)).or_insert(0) += count;
                }
            }
            for pred in node.potential_predecessors() {
                let older = self.nodes.contains_key(&pred) && !batch.contains_key(&pred);
                if older {
                    *contributions.entry((pred, kmer.clone())).or_insert(0) += count;
                }
            }
        }

        trace!(
            "Committing {} edge contributions ({} k-mers, {} already present)",
            contributions.len(),
            batch.len(),
            already_present
        );
        for ((source, target), weight) in contributions {
            match self.policy {
                EdgeWeightPolicy::Cumulative => self.add_edge(&source, &target, weight),
                EdgeWeightPolicy::PerRead => self.raise_edge(&source, &target, weight),
                EdgeWeightPolicy::Constant => self.raise_edge(&source, &target, 1),
            }
        }
        Ok(())
    }

    /// Upper-cases keys, drops zero counts, rejects non-ASCII keys and checks
    /// every length against the graph's k (or the first key's length if k is
    /// not fixed yet).
    fn validate_batch(
        &self,
        counts: &KmerCounts,
    ) -> Result<BTreeMap<String, usize>, AssemblerError> {
        let mut batch: BTreeMap<String, usize> = BTreeMap::new();
        for (kmer, &count) in counts {
            if count > 0 {
                *batch.entry(normalize_sequence(kmer)).or_insert(0) += count;
            }
        }

        for kmer in batch.keys() {
            check_ascii(kmer)?;
        }

        let Some(first_len) = batch.keys().next().map(String::len) else {
            return Ok(batch);
        };
        let expected = self.k.unwrap_or(first_len);
        if expected == 0 {
            return Err(AssemblerError::InvalidKmerSize(0));
        }
        if let Some(bad) = batch.keys().find(|kmer| kmer.len() != expected) {
            return Err(AssemblerError::IncompatibleKmerLength {
                expected,
                actual: bad.len(),
            });
        }
        Ok(batch)
    }

    /// The single mutation path for edges: both endpoints are updated together.
    fn add_edge(&mut self, source: &str, target: &str, increment: usize) {
        if increment == 0 {
            return;
        }
        if let Some(node) = self.nodes.get_mut(source) {
            node.add_outgoing(target, increment);
        }
        if let Some(node) = self.nodes.get_mut(target) {
            node.add_incoming(source, increment);
        }
    }

    /// Raises an edge to at least `weight`.
    fn raise_edge(&mut self, source: &str, target: &str, weight: usize) {
        let current = self
            .nodes
            .get(source)
            .map_or(0, |node| node.edge_weight_to(target));
        self.add_edge(source, target, weight.saturating_sub(current));
    }

    /// Checks the mirror invariant: every outgoing edge has a matching
    /// incoming edge of equal weight on an existing node, and vice versa.
    pub fn is_consistent(&self) -> bool {
        self.nodes.values().all(|node| {
            let forward = node.successors().all(|(target, weight)| {
                self.nodes
                    .get(target)
                    .is_some_and(|t| t.edge_weight_from(node.sequence()) == weight)
            });
            let backward = node.predecessors().all(|(source, weight)| {
                self.nodes
                    .get(source)
                    .is_some_and(|s| s.edge_weight_to(node.sequence()) == weight)
            });
            forward && backward && node.sequence().len() == self.k.unwrap_or(0)
        })
    }
}

impl fmt::Display for DeBruijnGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let k = self.k.map_or_else(|| "-".to_string(), |k| k.to_string());
        write!(
            f,
            "DBG({}) with {} nodes and {} edges",
            k,
            self.count_nodes(),
            self.count_edges()
        )
    }
}
