//! Snapshot of a trained machine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Hypervectors, Result, automaton::chunks_for};

/// # Overview
///
/// Raw automaton words, clause weights and the shape metadata needed to
/// rebuild them.
///
/// Produced by [`get_state`](crate::GraphTsetlinMachine::get_state) and
/// consumed by [`set_state`](crate::GraphTsetlinMachine::set_state).
/// Scores are bit-identical across the round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MachineState {
    /// Surface automata, laid out `[clause][chunk][state_bit]`.
    pub clause_states:  Vec<u32>,
    /// Message automata of each round, same layout over message chunks.
    pub message_states: Vec<Vec<u32>>,
    /// Clause weights, laid out `[output][clause]`.
    pub weights:        Vec<i32>,
    pub outputs:        usize,
    pub clauses:        usize,
    /// Surface literals, twice the number of node features.
    pub literals:       usize,
    pub depth:          usize,
    pub state_bits:     u8,
    pub ta_chunks:      usize,
    pub message_size:   usize,
    pub hypervectors:   Hypervectors
}

impl MachineState {
    /// Checks the metadata against the payload sizes.
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 || self.message_states.len() != self.depth - 1 {
            return Err(Error::InvalidState(format!(
                "{} message layer(s) for depth {}",
                self.message_states.len(),
                self.depth
            )));
        }
        if self.literals == 0 || self.literals % 2 != 0 {
            return Err(Error::InvalidState(format!(
                "literal count {} is not a positive even number",
                self.literals
            )));
        }
        if self.ta_chunks != chunks_for(self.literals) {
            return Err(Error::InvalidState(format!(
                "{} chunks cannot hold {} literals",
                self.ta_chunks, self.literals
            )));
        }
        if self.outputs == 0 || self.weights.len() != self.outputs * self.clauses {
            return Err(Error::InvalidState(format!(
                "{} weights for {} outputs x {} clauses",
                self.weights.len(),
                self.outputs,
                self.clauses
            )));
        }
        if self.hypervectors.clauses() != self.clauses
            || self.hypervectors.message_size() != self.message_size
        {
            return Err(Error::InvalidState("hypervector table shape".into()));
        }
        Ok(())
    }
}
