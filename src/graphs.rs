//! Packed graph sets consumed by the machine.
//!
//! A [`GraphSet`] is the flat, prefix-indexed layout produced by a graph
//! builder: nodes of all graphs in one array, outgoing edges of all nodes in
//! another, and one packed literal row per node.
//!
//! ```text
//! node_index[g]   -> first node of graph g
//! edge_index[n]   -> first outgoing edge of (global) node n
//! x[n * chunks..] -> literals of node n: bit k = feature k, bit F+k = ¬feature k
//! ```
//!
//! Symbol hashing lives with the caller; [`GraphSetBuilder`] only packs
//! explicit feature indices.

use std::hash::{DefaultHasher, Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    automaton::{CHUNK_BITS, chunks_for},
    error::{Error, Result}
};

/// An outgoing edge: graph-local destination node and edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    pub destination: u32,
    pub edge_type:   u32
}

/// # Overview
///
/// A validated set of attributed graphs in packed form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraphSet {
    number_of_features:         usize,
    ta_chunks:                  usize,
    number_of_graph_nodes:      Vec<u32>,
    node_index:                 Vec<usize>,
    number_of_graph_node_edges: Vec<u32>,
    edge_index:                 Vec<usize>,
    edges:                      Vec<Edge>,
    x:                          Vec<u32>,
    max_number_of_graph_nodes:  usize,
    signature:                  u64
}

/// Borrowed view of one graph of a [`GraphSet`].
#[derive(Debug, Clone, Copy)]
pub struct GraphRef<'a> {
    /// Number of nodes.
    pub nodes:      usize,
    /// Packed literal rows of the graph's nodes.
    pub x:          &'a [u32],
    /// Outgoing edge count per node.
    pub edge_count: &'a [u32],
    /// Outgoing edges of all nodes, grouped by source node.
    pub edges:      &'a [Edge]
}

impl GraphRef<'_> {
    /// Outgoing edges grouped per source node.
    pub fn edges_by_node(&self) -> impl Iterator<Item = (usize, &[Edge])> + '_ {
        let mut start = 0usize;
        self.edge_count.iter().enumerate().map(move |(node, &count)| {
            let end = start + count as usize;
            let slice = &self.edges[start..end];
            start = end;
            (node, slice)
        })
    }
}

impl GraphSet {
    /// Assembles a graph set from per-graph node counts, per-node edge
    /// counts, grouped edges and packed literal rows.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyDataset`] when there are no graphs
    /// - [`Error::EmptyGraph`] when a graph has no nodes
    /// - [`Error::DimensionMismatch`] when array lengths disagree
    /// - [`Error::InvalidGraph`] when an edge leaves its graph
    pub fn from_parts(
        number_of_features: usize,
        number_of_graph_nodes: Vec<u32>,
        number_of_graph_node_edges: Vec<u32>,
        edges: Vec<Edge>,
        x: Vec<u32>
    ) -> Result<Self> {
        if number_of_graph_nodes.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if number_of_features == 0 {
            return Err(Error::InvalidGraph("number of features must be > 0".into()));
        }
        if let Some(graph) = number_of_graph_nodes.iter().position(|&n| n == 0) {
            return Err(Error::EmptyGraph { graph });
        }

        let node_index = prefix_sums(&number_of_graph_nodes);
        let total_nodes = node_index.last().copied().unwrap_or(0)
            + number_of_graph_nodes.last().copied().unwrap_or(0) as usize;
        check_len("node edge counts", total_nodes, number_of_graph_node_edges.len())?;

        let edge_index = prefix_sums(&number_of_graph_node_edges);
        let total_edges: usize = number_of_graph_node_edges.iter().map(|&c| c as usize).sum();
        check_len("edges", total_edges, edges.len())?;

        let ta_chunks = chunks_for(2 * number_of_features);
        check_len("literal words", total_nodes * ta_chunks, x.len())?;

        for (graph, (&nodes, &first)) in number_of_graph_nodes.iter().zip(&node_index).enumerate() {
            let last = first + nodes as usize;
            let edge_range = edge_index[first]..edge_index[first] + count_edges(&number_of_graph_node_edges[first..last]);
            if let Some(edge) = edges[edge_range].iter().find(|e| e.destination >= nodes) {
                return Err(Error::InvalidGraph(format!(
                    "graph {graph}: edge destination {} out of {nodes} nodes",
                    edge.destination
                )));
            }
        }

        let max_number_of_graph_nodes = number_of_graph_nodes.iter().copied().max().unwrap_or(0) as usize;

        let mut set = Self {
            number_of_features,
            ta_chunks,
            number_of_graph_nodes,
            node_index,
            number_of_graph_node_edges,
            edge_index,
            edges,
            x,
            max_number_of_graph_nodes,
            signature: 0
        };
        set.signature = set.compute_signature();
        Ok(set)
    }

    fn compute_signature(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.number_of_features.hash(&mut hasher);
        self.number_of_graph_nodes.hash(&mut hasher);
        self.number_of_graph_node_edges.hash(&mut hasher);
        self.edges.hash(&mut hasher);
        self.x.hash(&mut hasher);
        hasher.finish()
    }

    #[inline]
    pub fn number_of_graphs(&self) -> usize {
        self.number_of_graph_nodes.len()
    }

    /// Node properties per node (the hypervector size).
    #[inline]
    pub fn number_of_features(&self) -> usize {
        self.number_of_features
    }

    /// Literals per node, `2 * number_of_features`.
    #[inline]
    pub fn literals(&self) -> usize {
        2 * self.number_of_features
    }

    /// Packed words per node row.
    #[inline]
    pub fn ta_chunks(&self) -> usize {
        self.ta_chunks
    }

    #[inline]
    pub fn max_number_of_graph_nodes(&self) -> usize {
        self.max_number_of_graph_nodes
    }

    /// Node count of one graph.
    #[inline]
    pub fn graph_nodes(&self, graph: usize) -> usize {
        self.number_of_graph_nodes[graph] as usize
    }

    /// Identity of the set's contents, used to reuse scratch buffers.
    #[inline]
    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// Borrowed view of one graph.
    pub fn graph(&self, graph: usize) -> GraphRef<'_> {
        let nodes = self.graph_nodes(graph);
        let first = self.node_index[graph];
        let edge_count = &self.number_of_graph_node_edges[first..first + nodes];
        let first_edge = self.edge_index[first];

        GraphRef {
            nodes,
            x: &self.x[first * self.ta_chunks..(first + nodes) * self.ta_chunks],
            edge_count,
            edges: &self.edges[first_edge..first_edge + count_edges(edge_count)]
        }
    }
}

fn prefix_sums(counts: &[u32]) -> Vec<usize> {
    let mut acc = 0usize;
    counts
        .iter()
        .map(|&c| {
            let start = acc;
            acc += c as usize;
            start
        })
        .collect()
}

fn count_edges(counts: &[u32]) -> usize {
    counts.iter().map(|&c| c as usize).sum()
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            what,
            expected,
            got
        })
    }
}

#[derive(Debug, Clone, Default)]
struct PendingGraph {
    nodes:    usize,
    features: Vec<(usize, usize)>,
    edges:    Vec<(usize, Edge)>
}

/// # Overview
///
/// Packs graphs given as explicit node feature indices and typed edges.
///
/// # Examples
///
/// ```
/// use graph_tsetlin_rs::GraphSetBuilder;
///
/// let mut builder = GraphSetBuilder::new(2);
/// let g = builder.add_graph(2);
/// builder.add_feature(g, 0, 0);
/// builder.add_feature(g, 1, 1);
/// builder.add_edge(g, 0, 1, 0);
/// builder.add_edge(g, 1, 0, 0);
///
/// let graphs = builder.build().unwrap();
/// assert_eq!(graphs.number_of_graphs(), 1);
/// assert_eq!(graphs.graph(0).edges.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct GraphSetBuilder {
    number_of_features: usize,
    graphs:             Vec<PendingGraph>,
    unknown_graph:      Option<usize>
}

impl GraphSetBuilder {
    pub fn new(number_of_features: usize) -> Self {
        Self {
            number_of_features,
            graphs: Vec::new(),
            unknown_graph: None
        }
    }

    /// Adds a graph with `nodes` nodes and returns its index.
    pub fn add_graph(&mut self, nodes: usize) -> usize {
        self.graphs.push(PendingGraph {
            nodes,
            ..PendingGraph::default()
        });
        self.graphs.len() - 1
    }

    /// Marks `feature` as present at `node` of `graph`.
    pub fn add_feature(&mut self, graph: usize, node: usize, feature: usize) -> &mut Self {
        match self.graphs.get_mut(graph) {
            Some(pending) => pending.features.push((node, feature)),
            None => self.mark_unknown(graph)
        }
        self
    }

    /// Adds a directed edge between graph-local nodes.
    pub fn add_edge(
        &mut self,
        graph: usize,
        source: usize,
        destination: usize,
        edge_type: u32
    ) -> &mut Self {
        let edge = Edge {
            destination: destination as u32,
            edge_type
        };
        match self.graphs.get_mut(graph) {
            Some(pending) => pending.edges.push((source, edge)),
            None => self.mark_unknown(graph)
        }
        self
    }

    /// Keeps the first unknown graph index for [`build`](Self::build).
    fn mark_unknown(&mut self, graph: usize) {
        self.unknown_graph.get_or_insert(graph);
    }

    /// Packs all graphs into a validated [`GraphSet`].
    pub fn build(self) -> Result<GraphSet> {
        if let Some(graph) = self.unknown_graph {
            return Err(Error::InvalidGraph(format!(
                "graph {graph} was never added ({} graphs)",
                self.graphs.len()
            )));
        }
        let features = self.number_of_features;
        let chunks = chunks_for(2 * features);

        let mut number_of_graph_nodes = Vec::with_capacity(self.graphs.len());
        let mut number_of_graph_node_edges = Vec::new();
        let mut edges = Vec::new();
        let mut x = Vec::new();

        for (graph, pending) in self.graphs.into_iter().enumerate() {
            number_of_graph_nodes.push(pending.nodes as u32);

            let mut rows = vec![0u32; pending.nodes * chunks];
            for row in rows.chunks_mut(chunks.max(1)) {
                for k in 0..features {
                    set_bit(row, features + k);
                }
            }
            for (node, feature) in pending.features {
                if node >= pending.nodes || feature >= features {
                    return Err(Error::InvalidGraph(format!(
                        "graph {graph}: feature {feature} at node {node} out of range"
                    )));
                }
                let row = &mut rows[node * chunks..(node + 1) * chunks];
                set_bit(row, feature);
                clear_bit(row, features + feature);
            }
            x.extend_from_slice(&rows);

            let mut graph_edges = pending.edges;
            if let Some((source, _)) = graph_edges.iter().find(|(s, _)| *s >= pending.nodes) {
                return Err(Error::InvalidGraph(format!(
                    "graph {graph}: edge source {source} out of {} nodes",
                    pending.nodes
                )));
            }
            graph_edges.sort_by_key(|(source, _)| *source);
            let mut counts = vec![0u32; pending.nodes];
            for (source, edge) in graph_edges {
                counts[source] += 1;
                edges.push(edge);
            }
            number_of_graph_node_edges.extend(counts);
        }

        GraphSet::from_parts(features, number_of_graph_nodes, number_of_graph_node_edges, edges, x)
    }
}

#[inline]
fn set_bit(row: &mut [u32], bit: usize) {
    row[bit / CHUNK_BITS] |= 1 << (bit % CHUNK_BITS);
}

#[inline]
fn clear_bit(row: &mut [u32], bit: usize) {
    row[bit / CHUNK_BITS] &= !(1 << (bit % CHUNK_BITS));
}
