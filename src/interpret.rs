//! Reading learned clauses back as symbols.
//!
//! Surface clauses include literals over hypervector positions, and message
//! clauses include literals over message positions. Both can be projected
//! onto the symbols that produced those positions: a symbol "matches" a
//! clause to the degree its positions are included.

use crate::{Error, GraphTsetlinMachine, Result, automaton::StateBank, codec::LabelCodec};

/// Fraction of `positions` included among the positive half and the
/// negated half of a hyperliteral row.
fn hypervector_match(row: &[u8], positions: &[usize]) -> (f32, f32) {
    let half = row.len() / 2;
    let (positive, negated) = row.split_at(half);
    let n = positions.len().max(1) as f32;

    let pos = positions.iter().filter(|&&p| positive[p] == 1).count() as f32;
    let neg = positions.iter().filter(|&&p| negated[p] == 1).count() as f32;
    (pos / n, neg / n)
}

fn actions(bank: &StateBank) -> Vec<Vec<u8>> {
    (0..bank.clauses())
        .map(|clause| {
            (0..bank.literals())
                .map(|literal| u8::from(bank.action(clause, literal)))
                .collect()
        })
        .collect()
}

impl<C: LabelCodec> GraphTsetlinMachine<C> {
    fn bank_at(&self, depth: usize) -> Result<&StateBank> {
        let model = self.model()?;
        if depth == 0 {
            return Ok(&model.clause_bank);
        }
        model
            .message_banks
            .get(depth - 1)
            .ok_or(Error::DimensionMismatch {
                what:     "depth",
                expected: self.config.depth,
                got:      depth
            })
    }

    /// # Overview
    ///
    /// Include action of automaton `ta` of `clause` at `depth`.
    ///
    /// Depth 0 addresses surface literals, depth `d > 0` the message
    /// literals of round `d`.
    pub fn ta_action(&self, depth: usize, clause: usize, ta: usize) -> Result<bool> {
        let bank = self.bank_at(depth)?;
        if clause >= bank.clauses() {
            return Err(Error::DimensionMismatch {
                what:     "clause",
                expected: bank.clauses(),
                got:      clause
            });
        }
        if ta >= bank.literals() {
            return Err(Error::DimensionMismatch {
                what:     "literal",
                expected: bank.literals(),
                got:      ta
            });
        }
        Ok(bank.action(clause, ta))
    }

    /// `[clause][literal]` include actions (0/1) at `depth`.
    pub fn hyperliterals(&self, depth: usize) -> Result<Vec<Vec<u8>>> {
        self.bank_at(depth).map(actions)
    }

    /// # Overview
    ///
    /// Projects surface clauses onto node symbols.
    ///
    /// `symbol_hypervectors[k]` lists the feature positions of symbol `k`.
    /// Returns `[clause][2 * symbols]`: entry `k` is the fraction of symbol
    /// `k`'s positions included, entry `symbols + k` the fraction included
    /// negated.
    pub fn clause_literals(&self, symbol_hypervectors: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        let literals = self.hyperliterals(0)?;
        let features = self.model()?.features;
        let symbols = symbol_hypervectors
            .iter()
            .map(|hv| {
                hv.iter()
                    .map(|&p| {
                        let p = p as usize;
                        if p < features {
                            Ok(p)
                        } else {
                            Err(Error::DimensionMismatch {
                                what:     "symbol position",
                                expected: features,
                                got:      p
                            })
                        }
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let n = symbols.len();
        Ok(literals
            .iter()
            .map(|row| {
                let mut out = vec![0.0; 2 * n];
                for (k, positions) in symbols.iter().enumerate() {
                    (out[k], out[n + k]) = hypervector_match(row, positions);
                }
                out
            })
            .collect())
    }

    /// # Overview
    ///
    /// Projects message clauses of round `depth` onto the clauses sending
    /// the messages.
    ///
    /// Returns `[edge_type][clause][2 * clauses]`: entry `s` tells how much
    /// of sender `s`'s hypervector, rotated by the edge type, the clause
    /// requires; entry `clauses + s` how much it requires absent. Depth 0
    /// carries no messages and is rejected.
    pub fn message_literals(&self, depth: usize, edge_types: usize) -> Result<Vec<Vec<Vec<f32>>>> {
        if depth == 0 {
            return Err(Error::DimensionMismatch {
                what:     "message depth",
                expected: self.config.depth,
                got:      depth
            });
        }
        let literals = self.hyperliterals(depth)?;
        let clauses = literals.len();
        let hv = &self.hypervectors;

        Ok((0..edge_types)
            .map(|edge_type| {
                let senders: Vec<Vec<usize>> = (0..clauses)
                    .map(|sender| hv.shifted(sender, edge_type as u32).collect())
                    .collect();
                literals
                    .iter()
                    .map(|row| {
                        let mut out = vec![0.0; 2 * clauses];
                        for (sender, positions) in senders.iter().enumerate() {
                            (out[sender], out[clauses + sender]) = hypervector_match(row, positions);
                        }
                        out
                    })
                    .collect()
            })
            .collect())
    }
}
