//! Message passing between graph nodes.
//!
//! Every round runs four phases, each finishing before the next starts:
//!
//! | Phase | Reads | Writes |
//! |-------|-------|--------|
//! | prepare | - | raw accumulator |
//! | exchange | `current`, edges, hypervectors | raw accumulator |
//! | encode | raw accumulator | encoded messages of the round |
//! | conditional evaluate | `current`, encoded messages | `next` |
//!
//! After a round `current` and `next` swap roles. A clause that holds at a
//! source node sends its hypervector, rotated by the edge type, to every
//! destination of the node's outgoing edges.

use crate::{
    automaton::{CHUNK_BITS, StateBank, chunks_for},
    evaluate::{ClauseNodeOutput, evaluate_conditional},
    graphs::GraphRef,
    hypervector::Hypervectors
};

/// # Overview
///
/// Scratch buffers for the message rounds of one graph.
///
/// `encoded[layer]` keeps the messages of every round so feedback can
/// reinforce message automata against what each node actually received.
#[derive(Debug, Clone)]
pub struct MessageBuffers {
    raw:            Vec<bool>,
    encoded:        Vec<Vec<u32>>,
    message_size:   usize,
    message_chunks: usize,
    max_nodes:      usize
}

impl MessageBuffers {
    /// Allocates buffers for `rounds` rounds over graphs of up to
    /// `max_nodes` nodes.
    pub fn new(rounds: usize, message_size: usize, max_nodes: usize) -> Self {
        let message_chunks = chunks_for(2 * message_size);
        Self {
            raw: vec![false; max_nodes * message_size],
            encoded: vec![vec![0; max_nodes * message_chunks]; rounds],
            message_size,
            message_chunks,
            max_nodes
        }
    }

    #[inline]
    pub fn message_chunks(&self) -> usize {
        self.message_chunks
    }

    #[inline]
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Encoded message literals received in round `layer`, one row of
    /// `message_chunks` words per node.
    #[inline]
    pub fn encoded(&self, layer: usize) -> &[u32] {
        &self.encoded[layer]
    }

    /// Clears the raw accumulator of the first `nodes` nodes.
    pub fn prepare(&mut self, nodes: usize) {
        self.raw[..nodes * self.message_size].fill(false);
    }

    /// ORs the rotated hypervector of every clause holding at a source node
    /// into the accumulator of each of its destinations.
    pub fn exchange(
        &mut self,
        graph: GraphRef<'_>,
        hypervectors: &Hypervectors,
        current: &ClauseNodeOutput
    ) {
        let m = self.message_size;
        for clause in 0..current.clauses() {
            for (source, edges) in graph.edges_by_node() {
                if edges.is_empty() || !current.get(clause, source) {
                    continue;
                }
                for edge in edges {
                    let base = edge.destination as usize * m;
                    for position in hypervectors.shifted(clause, edge.edge_type) {
                        self.raw[base + position] = true;
                    }
                }
            }
        }
    }

    /// Packs the accumulator into message literals: bit `k` when position
    /// `k` was received, bit `message_size + k` when it was not.
    pub fn encode(&mut self, layer: usize, nodes: usize) {
        let m = self.message_size;
        let chunks = self.message_chunks;
        let encoded = &mut self.encoded[layer];

        for node in 0..nodes {
            let row = &mut encoded[node * chunks..(node + 1) * chunks];
            row.fill(0);
            for (k, &received) in self.raw[node * m..(node + 1) * m].iter().enumerate() {
                let bit = if received { k } else { m + k };
                row[bit / CHUNK_BITS] |= 1 << (bit % CHUNK_BITS);
            }
        }
    }
}

/// # Overview
///
/// Runs every message round for one graph.
///
/// On entry `current` holds the surface clause outputs; on return it holds
/// the outputs of the last round. `include_counts[layer + 1]` receives the
/// include counts of `message_banks[layer]`.
#[allow(clippy::too_many_arguments)]
pub fn propagate(
    message_banks: &[StateBank],
    hypervectors: &Hypervectors,
    graph: GraphRef<'_>,
    buffers: &mut MessageBuffers,
    current: &mut ClauseNodeOutput,
    next: &mut ClauseNodeOutput,
    include_counts: &mut [Vec<usize>]
) {
    let nodes = graph.nodes;
    for (layer, bank) in message_banks.iter().enumerate() {
        buffers.prepare(nodes);
        buffers.exchange(graph, hypervectors, current);
        buffers.encode(layer, nodes);
        evaluate_conditional(
            bank,
            buffers.encoded(layer),
            nodes,
            current,
            next,
            &mut include_counts[layer + 1]
        );
        core::mem::swap(current, next);
        tracing::trace!(layer, nodes, "message round complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::GraphSetBuilder;

    fn line_graph() -> crate::GraphSet {
        // 0 -> 1 (type 0), 1 -> 2 (type 3), node 2 has no outgoing edges
        let mut builder = GraphSetBuilder::new(1);
        let g = builder.add_graph(3);
        builder.add_edge(g, 0, 1, 0).add_edge(g, 1, 2, 3);
        builder.build().unwrap()
    }

    #[test]
    fn exchange_sends_shifted_hypervector() {
        let graphs = line_graph();
        let hv = Hypervectors::double_hashing(1, 8);
        let row: Vec<usize> = hv.row(0).iter().map(|&p| p as usize).collect();
        let mut current = ClauseNodeOutput::new(1, 3);
        current.set(0, 0, true);
        current.set(0, 1, true);

        let mut buffers = MessageBuffers::new(1, 8, 3);
        buffers.prepare(3);
        buffers.exchange(graphs.graph(0), &hv, &current);

        for p in 0..8 {
            assert!(!buffers.raw[p], "node 0 receives nothing");
            assert_eq!(buffers.raw[8 + p], row.contains(&p));
            assert_eq!(buffers.raw[16 + p], row.iter().any(|&r| (r + 3) % 8 == p));
        }
    }

    #[test]
    fn encode_packs_present_and_absent() {
        let mut buffers = MessageBuffers::new(1, 4, 1);
        buffers.prepare(1);
        buffers.raw[1] = true;
        buffers.raw[2] = true;
        buffers.encode(0, 1);

        // present bits 1, 2; absent bits 4 + 0, 4 + 3
        assert_eq!(buffers.encoded(0)[0], 0b1001_0110);
    }

    #[test]
    fn silent_sources_send_nothing() {
        let graphs = line_graph();
        let hv = Hypervectors::double_hashing(2, 8);
        let current = ClauseNodeOutput::new(2, 3);

        let mut buffers = MessageBuffers::new(1, 8, 3);
        buffers.prepare(3);
        buffers.exchange(graphs.graph(0), &hv, &current);
        buffers.encode(0, 3);

        assert!(buffers.raw.iter().all(|&r| !r));
        // every node sees "all absent"
        for node in 0..3 {
            assert_eq!(buffers.encoded(0)[node], 0xFF00);
        }
    }

    #[test]
    fn propagate_swaps_into_current() {
        let graphs = line_graph();
        let hv = Hypervectors::double_hashing(1, 8);
        let mut bank = StateBank::new(1, 16, 8);
        // require message position p of clause 0 to be received
        let p = hv.row(0)[0] as usize;
        bank.increment(0, p);

        let mut current = ClauseNodeOutput::new(1, 3);
        for node in 0..3 {
            current.set(0, node, true);
        }
        let mut next = ClauseNodeOutput::new(1, 3);
        let mut buffers = MessageBuffers::new(1, 8, 3);
        let mut counts = vec![vec![0; 1]; 2];

        propagate(
            core::slice::from_ref(&bank),
            &hv,
            graphs.graph(0),
            &mut buffers,
            &mut current,
            &mut next,
            &mut counts
        );

        // only node 1 receives the unshifted hypervector
        assert!(!current.get(0, 0));
        assert!(current.get(0, 1));
        assert!(!current.get(0, 2));
        assert_eq!(counts[1][0], 1);
    }
}
