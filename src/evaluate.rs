//! Node-wise clause evaluation.
//!
//! A clause holds at a node when every included literal is present in that
//! node's packed literal row:
//!
//! ```text
//! holds(c, n) = for all chunks k: include[c][k] & x[n][k] == include[c][k]
//! ```
//!
//! A clause with no included literal holds at every node. The graph-level
//! truth of a clause is "holds at some node".

use rand::Rng;

use crate::automaton::{CHUNK_BITS, StateBank, chunks_for};

/// # Overview
///
/// Per-clause bitmask of nodes where the clause holds.
///
/// Laid out `[clause][node_chunk]`; bit `n % 32` of chunk `n / 32` belongs
/// to node `n` of the current graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseNodeOutput {
    words:       Vec<u32>,
    clauses:     usize,
    node_chunks: usize
}

impl ClauseNodeOutput {
    /// Allocates room for graphs of up to `max_nodes` nodes.
    pub fn new(clauses: usize, max_nodes: usize) -> Self {
        let node_chunks = chunks_for(max_nodes);
        Self {
            words: vec![0; clauses * node_chunks],
            clauses,
            node_chunks
        }
    }

    #[inline]
    pub fn clauses(&self) -> usize {
        self.clauses
    }

    /// Largest node count this buffer holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.node_chunks * CHUNK_BITS
    }

    #[inline]
    fn row(&self, clause: usize) -> &[u32] {
        &self.words[clause * self.node_chunks..(clause + 1) * self.node_chunks]
    }

    #[inline]
    fn row_mut(&mut self, clause: usize) -> &mut [u32] {
        &mut self.words[clause * self.node_chunks..(clause + 1) * self.node_chunks]
    }

    /// Whether `clause` holds at `node`.
    #[inline]
    pub fn get(&self, clause: usize, node: usize) -> bool {
        self.row(clause)[node / CHUNK_BITS] >> (node % CHUNK_BITS) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, clause: usize, node: usize, value: bool) {
        let word = &mut self.row_mut(clause)[node / CHUNK_BITS];
        let mask = 1u32 << (node % CHUNK_BITS);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Number of nodes among the first `nodes` where `clause` holds.
    pub fn count(&self, clause: usize, nodes: usize) -> usize {
        self.row(clause)
            .iter()
            .take(chunks_for(nodes))
            .enumerate()
            .map(|(chunk, &w)| (w & node_filter(chunk, nodes)).count_ones() as usize)
            .sum()
    }

    /// Whether `clause` holds at any of the first `nodes` nodes.
    pub fn any(&self, clause: usize, nodes: usize) -> bool {
        self.row(clause)
            .iter()
            .take(chunks_for(nodes))
            .enumerate()
            .any(|(chunk, &w)| w & node_filter(chunk, nodes) != 0)
    }

    /// Index of the `k`-th node (0-based) where `clause` holds.
    fn nth_node(&self, clause: usize, nodes: usize, mut k: usize) -> Option<usize> {
        for (chunk, &w) in self.row(clause).iter().take(chunks_for(nodes)).enumerate() {
            let mut bits = w & node_filter(chunk, nodes);
            let ones = bits.count_ones() as usize;
            if k >= ones {
                k -= ones;
                continue;
            }
            for _ in 0..k {
                bits &= bits - 1;
            }
            return Some(chunk * CHUNK_BITS + bits.trailing_zeros() as usize);
        }
        None
    }
}

/// Valid-node mask for a chunk of a graph with `nodes` nodes.
#[inline]
fn node_filter(chunk: usize, nodes: usize) -> u32 {
    let remaining = nodes.saturating_sub(chunk * CHUNK_BITS);
    if remaining >= CHUNK_BITS {
        u32::MAX
    } else {
        !(u32::MAX << remaining)
    }
}

/// Loads the include masks of one clause into `include`.
#[inline]
fn load_include(bank: &StateBank, clause: usize, include: &mut [u32]) {
    for (chunk, word) in include.iter_mut().enumerate() {
        *word = bank.action_chunk(clause, chunk);
    }
}

#[inline]
fn clause_holds(include: &[u32], row: &[u32]) -> bool {
    include.iter().zip(row).all(|(&inc, &x)| inc & x == inc)
}

/// # Overview
///
/// Evaluates every clause of `bank` at every node of one graph.
///
/// `x` holds `bank.chunks()` literal words per node. The include count of
/// each clause is written to `include_counts` for the feedback cap.
pub fn evaluate_clause_node_output(
    bank: &StateBank,
    x: &[u32],
    nodes: usize,
    output: &mut ClauseNodeOutput,
    include_counts: &mut [usize]
) {
    let chunks = bank.chunks();
    debug_assert!(x.len() >= nodes * chunks);
    debug_assert!(nodes <= output.capacity());

    let mut include = vec![0u32; chunks];
    for clause in 0..bank.clauses() {
        load_include(bank, clause, &mut include);
        include_counts[clause] = include.iter().map(|w| w.count_ones() as usize).sum();

        let row = output.row_mut(clause);
        row.fill(0);
        for (node, literals) in x.chunks_exact(chunks).take(nodes).enumerate() {
            if clause_holds(&include, literals) {
                row[node / CHUNK_BITS] |= 1 << (node % CHUNK_BITS);
            }
        }
    }
}

/// # Overview
///
/// Message-layer evaluation: a clause holds at a node in `next` only if it
/// held there in `current` and its message literals are satisfied by the
/// node's encoded incoming messages.
pub fn evaluate_conditional(
    bank: &StateBank,
    messages: &[u32],
    nodes: usize,
    current: &ClauseNodeOutput,
    next: &mut ClauseNodeOutput,
    include_counts: &mut [usize]
) {
    let chunks = bank.chunks();
    debug_assert!(messages.len() >= nodes * chunks);

    let mut include = vec![0u32; chunks];
    for clause in 0..bank.clauses() {
        load_include(bank, clause, &mut include);
        include_counts[clause] = include.iter().map(|w| w.count_ones() as usize).sum();

        let row = next.row_mut(clause);
        row.fill(0);
        for (node, literals) in messages.chunks_exact(chunks).take(nodes).enumerate() {
            if current.get(clause, node) && clause_holds(&include, literals) {
                row[node / CHUNK_BITS] |= 1 << (node % CHUNK_BITS);
            }
        }
    }
}

/// # Overview
///
/// Picks one satisfying node per clause, uniformly at random.
///
/// Clauses that hold nowhere get `None`. One draw is consumed per clause
/// that holds somewhere, in clause order.
pub fn select_clause_node<R: Rng>(
    output: &ClauseNodeOutput,
    nodes: usize,
    rng: &mut R,
    clause_node: &mut [Option<usize>]
) {
    for (clause, slot) in clause_node.iter_mut().enumerate().take(output.clauses()) {
        let count = output.count(clause, nodes);
        *slot = if count == 0 {
            None
        } else {
            output.nth_node(clause, nodes, rng.random_range(0..count))
        };
    }
}

/// # Overview
///
/// Adds the weights of every clause that holds somewhere in the graph.
///
/// `weights` is laid out `[output][clause]`. Sums are raw: clipping to
/// `[-T, T]` happens in feedback only.
pub fn accumulate_class_sum(
    output: &ClauseNodeOutput,
    weights: &[i32],
    nodes: usize,
    class_sum: &mut [i32]
) {
    let clauses = output.clauses();
    for clause in 0..clauses {
        if !output.any(clause, nodes) {
            continue;
        }
        for (class_id, sum) in class_sum.iter_mut().enumerate() {
            *sum = sum.saturating_add(weights[class_id * clauses + clause]);
        }
    }
}

/// Number of satisfying nodes per clause.
pub fn clause_counts(output: &ClauseNodeOutput, nodes: usize) -> Vec<i32> {
    (0..output.clauses())
        .map(|clause| output.count(clause, nodes) as i32)
        .collect()
}

/// `[clause][node]` 0/1 matrix padded to `width` nodes.
pub fn clause_node_matrix(output: &ClauseNodeOutput, nodes: usize, width: usize) -> Vec<Vec<i32>> {
    (0..output.clauses())
        .map(|clause| {
            (0..width)
                .map(|node| i32::from(node < nodes && output.get(clause, node)))
                .collect()
        })
        .collect()
}
