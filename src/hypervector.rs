//! Clause hypervectors used to encode messages.
//!
//! Each clause owns `message_bits` distinct positions in a
//! `message_size`-wide space. A clause that holds at a node sends those
//! positions, rotated by the edge type, to the node's neighbours.

use rand::{Rng, seq::index};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// # Overview
///
/// Read-only `clauses × message_bits` table of message positions.
///
/// # Examples
///
/// ```
/// use graph_tsetlin_rs::{Hypervectors, utils::rng_from_seed};
///
/// let mut rng = rng_from_seed(1);
/// let hv = Hypervectors::random(10, 64, 3, &mut rng);
///
/// assert_eq!(hv.row(4).len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hypervectors {
    positions:    Vec<u32>,
    message_size: usize,
    message_bits: usize
}

impl Hypervectors {
    /// Draws `message_bits` distinct positions per clause, uniformly.
    pub fn random<R: Rng>(
        clauses: usize,
        message_size: usize,
        message_bits: usize,
        rng: &mut R
    ) -> Self {
        debug_assert!(message_bits <= message_size);
        let mut positions = Vec::with_capacity(clauses * message_bits);
        for _ in 0..clauses {
            let row = index::sample(rng, message_size, message_bits);
            positions.extend(row.iter().map(|p| p as u32));
        }

        Self {
            positions,
            message_size,
            message_bits
        }
    }

    /// Deterministic double hashing with two positions per clause.
    ///
    /// First position is `i % m`, the second `prime - i % prime` where
    /// `prime` is the largest prime below `m`. A collision probes forward so
    /// both positions stay distinct.
    pub fn double_hashing(clauses: usize, message_size: usize) -> Self {
        let m = message_size;
        let prime = prev_prime(m);
        let mut positions = Vec::with_capacity(clauses * 2);

        for i in 0..clauses {
            let first = i % m;
            let mut second = (prime - i % prime) % m;
            while second == first {
                second = (second + 1) % m;
            }
            positions.push(first as u32);
            positions.push(second as u32);
        }

        Self {
            positions,
            message_size,
            message_bits: 2
        }
    }

    /// Positions of one clause.
    #[inline]
    pub fn row(&self, clause: usize) -> &[u32] {
        let start = clause * self.message_bits;
        &self.positions[start..start + self.message_bits]
    }

    /// Positions of one clause rotated by `edge_type`.
    #[inline]
    pub fn shifted(&self, clause: usize, edge_type: u32) -> impl Iterator<Item = usize> + '_ {
        let m = self.message_size;
        let shift = edge_type as usize % m;
        self.row(clause)
            .iter()
            .map(move |&p| (p as usize + shift) % m)
    }

    #[inline]
    pub fn clauses(&self) -> usize {
        self.positions.len() / self.message_bits
    }

    #[inline]
    pub fn message_size(&self) -> usize {
        self.message_size
    }

    #[inline]
    pub fn message_bits(&self) -> usize {
        self.message_bits
    }
}

/// Largest prime strictly below `n` (`n >= 3`).
pub(crate) fn prev_prime(n: usize) -> usize {
    (2..n).rev().find(|&k| is_prime(k)).unwrap_or(2)
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n.is_multiple_of(d) {
            return false;
        }
        d += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::rng_from_seed;

    fn distinct(row: &[u32]) -> bool {
        row.iter()
            .enumerate()
            .all(|(i, a)| row[i + 1..].iter().all(|b| a != b))
    }

    #[test]
    fn random_rows_are_distinct() {
        let mut rng = rng_from_seed(42);
        let hv = Hypervectors::random(200, 16, 5, &mut rng);

        for clause in 0..200 {
            let row = hv.row(clause);
            assert!(distinct(row));
            assert!(row.iter().all(|&p| (p as usize) < 16));
        }
    }

    #[test]
    fn double_hashing_rows_are_distinct() {
        let hv = Hypervectors::double_hashing(1000, 256);

        assert_eq!(hv.message_bits(), 2);
        for clause in 0..1000 {
            let row = hv.row(clause);
            assert!(distinct(row), "clause {clause}: {row:?}");
            assert!(row.iter().all(|&p| (p as usize) < 256));
        }
    }

    #[test]
    fn shift_wraps_around() {
        let hv = Hypervectors::double_hashing(1, 8);
        let shifted: Vec<usize> = hv.shifted(0, 9).collect();
        let expected: Vec<usize> = hv.row(0).iter().map(|&p| (p as usize + 1) % 8).collect();

        assert_eq!(shifted, expected);
    }

    #[test]
    fn primes() {
        assert_eq!(prev_prime(256), 251);
        assert_eq!(prev_prime(16), 13);
        assert_eq!(prev_prime(3), 2);
        assert!(!is_prime(1));
        assert!(is_prime(97));
    }
}
