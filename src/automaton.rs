//! Bit-sliced storage for Tsetlin automata.
//!
//! [`StateBank`] packs one multi-bit saturating counter per (clause, literal)
//! pair. Counters are sliced across `state_bits` words per 32-literal chunk:
//!
//! ```text
//! words: [clause 0: chunk 0: bit 0 .. bit B-1 | chunk 1: bit 0 .. | ...]
//!        [clause 1: ...]
//! ```
//!
//! Bit `l % 32` of word `(clause * chunks + l / 32) * B + b` is bit `b` of the
//! counter for literal `l`. The most significant plane is the automaton
//! action: set means "include".
//!
//! Whole chunks are updated at once with ripple-carry addition, which
//! saturates at `0` and `2^B - 1` instead of wrapping.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of literals per chunk word.
pub const CHUNK_BITS: usize = 32;

/// # Overview
///
/// Packed automaton counters for `clauses × literals` pairs.
///
/// # Examples
///
/// ```
/// use graph_tsetlin_rs::StateBank;
///
/// let mut bank = StateBank::new(2, 10, 8);
/// assert!(!bank.action(0, 3));
///
/// bank.increment(0, 3);
/// assert!(bank.action(0, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateBank {
    words:      Vec<u32>,
    clauses:    usize,
    literals:   usize,
    chunks:     usize,
    state_bits: usize,
    filter:     u32
}

impl StateBank {
    /// Creates a bank with every counter at the cold-start state.
    ///
    /// # Panics
    ///
    /// Panics if `clauses` or `literals` is zero.
    pub fn new(clauses: usize, literals: usize, state_bits: u8) -> Self {
        assert!(clauses > 0, "clauses must be positive");
        assert!(literals > 0, "literals must be positive");

        let state_bits = state_bits as usize;
        let chunks = chunks_for(literals);
        let mut bank = Self {
            words: vec![0; clauses * chunks * state_bits],
            clauses,
            literals,
            chunks,
            state_bits,
            filter: filter_for(literals)
        };
        bank.initialize();
        bank
    }

    /// Rebuilds a bank from exported words.
    pub fn from_words(
        clauses: usize,
        literals: usize,
        state_bits: u8,
        words: Vec<u32>
    ) -> Result<Self> {
        let chunks = chunks_for(literals);
        let expected = clauses * chunks * state_bits as usize;
        if words.len() != expected {
            return Err(Error::DimensionMismatch {
                what: "automaton words",
                expected,
                got: words.len()
            });
        }
        Ok(Self {
            words,
            clauses,
            literals,
            chunks,
            state_bits: state_bits as usize,
            filter: filter_for(literals)
        })
    }

    /// Resets every counter to `2^(B-1) - 1`: all lower planes set, action
    /// plane clear. One increment flips any automaton to "include".
    pub fn initialize(&mut self) {
        let bits = self.state_bits;
        for clause in 0..self.clauses {
            for chunk in 0..self.chunks {
                let base = self.offset(clause, chunk);
                let filter = self.chunk_filter(chunk);
                for b in 0..bits - 1 {
                    self.words[base + b] = filter;
                }
                self.words[base + bits - 1] = 0;
            }
        }
    }

    /// Returns number of clauses.
    #[inline]
    pub fn clauses(&self) -> usize {
        self.clauses
    }

    /// Returns number of literals per clause.
    #[inline]
    pub fn literals(&self) -> usize {
        self.literals
    }

    /// Returns number of chunk words per clause and bit plane.
    #[inline]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    #[inline]
    pub fn state_bits(&self) -> usize {
        self.state_bits
    }

    /// Largest counter value, `2^B - 1`.
    #[inline]
    pub fn max_state(&self) -> u32 {
        ((1u64 << self.state_bits) - 1) as u32
    }

    /// Raw words in `[clause][chunk][bit]` order.
    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Mask of valid literal positions in the given chunk.
    #[inline]
    pub fn chunk_filter(&self, chunk: usize) -> u32 {
        if chunk + 1 == self.chunks {
            self.filter
        } else {
            u32::MAX
        }
    }

    #[inline]
    fn offset(&self, clause: usize, chunk: usize) -> usize {
        (clause * self.chunks + chunk) * self.state_bits
    }

    /// Include mask (action plane) of one chunk, unused bits cleared.
    #[inline]
    pub fn action_chunk(&self, clause: usize, chunk: usize) -> u32 {
        self.words[self.offset(clause, chunk) + self.state_bits - 1] & self.chunk_filter(chunk)
    }

    /// Returns the action for an automaton (true = include).
    #[inline]
    pub fn action(&self, clause: usize, literal: usize) -> bool {
        debug_assert!(literal < self.literals);
        self.action_chunk(clause, literal / CHUNK_BITS) >> (literal % CHUNK_BITS) & 1 == 1
    }

    /// Number of included literals in a clause.
    pub fn include_count(&self, clause: usize) -> usize {
        (0..self.chunks)
            .map(|chunk| self.action_chunk(clause, chunk).count_ones() as usize)
            .sum()
    }

    /// Gets the counter value of one automaton.
    pub fn state(&self, clause: usize, literal: usize) -> u32 {
        debug_assert!(literal < self.literals);
        let base = self.offset(clause, literal / CHUNK_BITS);
        let pos = literal % CHUNK_BITS;

        (0..self.state_bits).fold(0u32, |state, b| {
            state | ((self.words[base + b] >> pos) & 1) << b
        })
    }

    /// Sets the counter value of one automaton. Values above the maximum
    /// are clamped.
    pub fn set_state(&mut self, clause: usize, literal: usize, state: u32) {
        debug_assert!(literal < self.literals);
        let state = state.min(self.max_state());
        let base = self.offset(clause, literal / CHUNK_BITS);
        let mask = 1u32 << (literal % CHUNK_BITS);

        for b in 0..self.state_bits {
            if (state >> b) & 1 == 1 {
                self.words[base + b] |= mask;
            } else {
                self.words[base + b] &= !mask;
            }
        }
    }

    /// Increments the counters flagged in `mask` within one chunk.
    ///
    /// Ripple-carry across the planes; a carry out of the top plane means
    /// the counter was already at the maximum, so those positions are
    /// restored to all ones.
    #[inline]
    pub fn increment_masked(&mut self, clause: usize, chunk: usize, mask: u32) {
        let mut carry = mask & self.chunk_filter(chunk);
        if carry == 0 {
            return;
        }

        let base = self.offset(clause, chunk);
        let planes = &mut self.words[base..base + self.state_bits];
        for plane in planes.iter_mut() {
            if carry == 0 {
                break;
            }
            let next = *plane & carry;
            *plane ^= carry;
            carry = next;
        }
        if carry != 0 {
            for plane in planes.iter_mut() {
                *plane |= carry;
            }
        }
    }

    /// Decrements the counters flagged in `mask` within one chunk.
    ///
    /// A borrow out of the top plane means the counter was at zero; those
    /// positions are cleared back to zero.
    #[inline]
    pub fn decrement_masked(&mut self, clause: usize, chunk: usize, mask: u32) {
        let mut borrow = mask & self.chunk_filter(chunk);
        if borrow == 0 {
            return;
        }

        let base = self.offset(clause, chunk);
        let planes = &mut self.words[base..base + self.state_bits];
        for plane in planes.iter_mut() {
            if borrow == 0 {
                break;
            }
            let next = !*plane & borrow;
            *plane ^= borrow;
            borrow = next;
        }
        if borrow != 0 {
            for plane in planes.iter_mut() {
                *plane &= !borrow;
            }
        }
    }

    /// Increments a single automaton state, saturating.
    #[inline]
    pub fn increment(&mut self, clause: usize, literal: usize) {
        debug_assert!(literal < self.literals);
        self.increment_masked(clause, literal / CHUNK_BITS, 1 << (literal % CHUNK_BITS));
    }

    /// Decrements a single automaton state, saturating.
    #[inline]
    pub fn decrement(&mut self, clause: usize, literal: usize) {
        debug_assert!(literal < self.literals);
        self.decrement_masked(clause, literal / CHUNK_BITS, 1 << (literal % CHUNK_BITS));
    }
}

/// Number of 32-bit chunks covering `literals` positions.
#[inline]
pub fn chunks_for(literals: usize) -> usize {
    literals.div_ceil(CHUNK_BITS).max(1)
}

/// Valid-bit mask for the last chunk of `literals` positions.
#[inline]
pub fn filter_for(literals: usize) -> u32 {
    match literals % CHUNK_BITS {
        0 => u32::MAX,
        rem => !(u32::MAX << rem)
    }
}
