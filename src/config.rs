//! Configuration and builder for the Graph Tsetlin Machine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest accepted threshold; feedback spans `2T` in `i32`.
pub const MAX_THRESHOLD: i32 = i32::MAX / 2;

/// # Overview
///
/// Hyper-parameters of a Graph Tsetlin Machine.
///
/// `s` holds one specificity per depth: `s[0]` drives the surface clauses,
/// `s[d]` the message automata of round `d`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[must_use]
pub struct Config {
    pub clauses:                      usize,
    pub threshold:                    i32,
    pub s:                            Vec<f32>,
    pub q:                            f32,
    pub max_included_literals:        Option<usize>,
    pub boost_true_positive_feedback: bool,
    pub state_bits:                   u8,
    pub depth:                        usize,
    pub message_size:                 usize,
    pub message_bits:                 usize,
    pub double_hashing:               bool,
    pub seed:                         u64
}

impl Config {
    /// # Overview
    ///
    /// Creates a new ConfigBuilder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// # Overview
    ///
    /// Validates configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.clauses == 0 {
            return Err(Error::MissingClauses);
        }
        if !(1..=MAX_THRESHOLD).contains(&self.threshold) {
            return Err(Error::InvalidThreshold);
        }
        if self.depth == 0 {
            return Err(Error::InvalidDepth);
        }
        if self.s.len() != self.depth || self.s.iter().any(|&s| !(s > 1.0)) {
            return Err(Error::InvalidSpecificity {
                count: self.s.len(),
                depth: self.depth
            });
        }
        if !(self.q > 0.0) {
            return Err(Error::InvalidQ);
        }
        if !(2..=31).contains(&self.state_bits) {
            return Err(Error::InvalidStateBits(self.state_bits));
        }
        if self.message_size < 3 {
            return Err(Error::InvalidMessageSize(self.message_size));
        }
        if self.message_bits == 0 || self.message_bits > self.message_size {
            return Err(Error::InvalidMessageBits(self.message_bits));
        }
        if self.max_included_literals == Some(0) {
            return Err(Error::InvalidMaxIncludedLiterals);
        }
        Ok(())
    }

    /// # Overview
    ///
    /// Specificity used at the given depth.
    #[inline]
    #[must_use]
    pub fn s_at(&self, depth: usize) -> f32 {
        self.s[depth]
    }

    /// # Overview
    ///
    /// Integer threshold for the `1/s` feedback draw at the given depth.
    #[inline]
    #[must_use]
    pub fn threshold_feedback(&self, depth: usize) -> u32 {
        prob_to_threshold(1.0 / self.s[depth])
    }
}

/// Converts probability [0.0, 1.0] to integer threshold for fast comparison.
///
/// Usage: `rng.random::<u32>() < threshold` is equivalent to
/// `rng.random::<f32>() < probability` but ~2x faster.
#[inline]
#[must_use]
pub fn prob_to_threshold(prob: f32) -> u32 {
    (prob.clamp(0.0, 1.0) as f64 * u32::MAX as f64) as u32
}

/// # Overview
///
/// Builder for Config with validation.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    clauses:                      Option<usize>,
    threshold:                    Option<i32>,
    s:                            Option<Vec<f32>>,
    q:                            Option<f32>,
    max_included_literals:        Option<usize>,
    boost_true_positive_feedback: Option<bool>,
    state_bits:                   Option<u8>,
    depth:                        Option<usize>,
    message_size:                 Option<usize>,
    message_bits:                 Option<usize>,
    double_hashing:               bool,
    seed:                         Option<u64>
}

impl ConfigBuilder {
    /// # Overview
    ///
    /// Sets the number of clauses.
    pub fn clauses(mut self, n: usize) -> Self {
        self.clauses = Some(n);
        self
    }

    /// # Overview
    ///
    /// Sets the voting threshold T.
    pub fn threshold(mut self, t: i32) -> Self {
        self.threshold = Some(t);
        self
    }

    /// # Overview
    ///
    /// Sets one specificity for every depth (default: 3.9).
    pub fn specificity(mut self, s: f32) -> Self {
        self.s = Some(vec![s]);
        self
    }

    /// # Overview
    ///
    /// Sets one specificity per depth. Length must equal the depth.
    pub fn specificity_per_depth(mut self, s: Vec<f32>) -> Self {
        self.s = Some(s);
        self
    }

    /// # Overview
    ///
    /// Sets q, the selection rate for negative targets (default: 1.0).
    pub fn q(mut self, q: f32) -> Self {
        self.q = Some(q);
        self
    }

    /// # Overview
    ///
    /// Caps the include actions per clause that still admit Type I
    /// strengthening (default: number of literals).
    pub fn max_included_literals(mut self, n: usize) -> Self {
        self.max_included_literals = Some(n);
        self
    }

    /// # Overview
    ///
    /// Enables deterministic strengthening of present literals (default: on).
    pub fn boost_true_positive_feedback(mut self, boost: bool) -> Self {
        self.boost_true_positive_feedback = Some(boost);
        self
    }

    /// # Overview
    ///
    /// Sets bits per automaton counter (default: 8).
    pub fn state_bits(mut self, bits: u8) -> Self {
        self.state_bits = Some(bits);
        self
    }

    /// # Overview
    ///
    /// Sets the number of layers; `depth - 1` message rounds (default: 1).
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// # Overview
    ///
    /// Sets the width of the message space (default: 256).
    pub fn message_size(mut self, size: usize) -> Self {
        self.message_size = Some(size);
        self
    }

    /// # Overview
    ///
    /// Sets positions per clause hypervector (default: 2).
    pub fn message_bits(mut self, bits: usize) -> Self {
        self.message_bits = Some(bits);
        self
    }

    /// # Overview
    ///
    /// Uses double hashing instead of random hypervectors. Forces two
    /// message bits.
    pub fn double_hashing(mut self, enabled: bool) -> Self {
        self.double_hashing = enabled;
        self
    }

    /// # Overview
    ///
    /// Sets the seed of the machine's random generator (default: 42).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// # Overview
    ///
    /// Builds and validates the Config.
    pub fn build(self) -> Result<Config> {
        let depth = self.depth.unwrap_or(1);
        let s = match self.s {
            Some(s) if s.len() == 1 => vec![s[0]; depth],
            Some(s) => s,
            None => vec![3.9; depth]
        };

        let mut message_bits = self.message_bits.unwrap_or(2);
        if self.double_hashing && message_bits != 2 {
            tracing::warn!(message_bits, "double hashing forces message_bits = 2");
            message_bits = 2;
        }

        let config = Config {
            clauses: self.clauses.ok_or(Error::MissingClauses)?,
            threshold: self.threshold.ok_or(Error::InvalidThreshold)?,
            s,
            q: self.q.unwrap_or(1.0),
            max_included_literals: self.max_included_literals,
            boost_true_positive_feedback: self.boost_true_positive_feedback.unwrap_or(true),
            state_bits: self.state_bits.unwrap_or(8),
            depth,
            message_size: self.message_size.unwrap_or(256),
            message_bits,
            double_hashing: self.double_hashing,
            seed: self.seed.unwrap_or(42)
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_with_defaults() {
        let config = Config::builder().clauses(20).threshold(15).build().unwrap();

        assert_eq!(config.clauses, 20);
        assert_eq!(config.threshold, 15);
        assert_eq!(config.state_bits, 8);
        assert_eq!(config.depth, 1);
        assert_eq!(config.message_size, 256);
        assert_eq!(config.message_bits, 2);
        assert!(config.boost_true_positive_feedback);
        assert!((config.s[0] - 3.9).abs() < 0.01);
    }

    #[test]
    fn scalar_s_broadcasts_to_depth() {
        let config = Config::builder()
            .clauses(4)
            .threshold(10)
            .depth(3)
            .specificity(2.0)
            .build()
            .unwrap();

        assert_eq!(config.s, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn per_depth_s_length_checked() {
        let result = Config::builder()
            .clauses(4)
            .threshold(10)
            .depth(3)
            .specificity_per_depth(vec![2.0, 3.0])
            .build();

        assert_eq!(
            result,
            Err(Error::InvalidSpecificity {
                count: 2,
                depth: 3
            })
        );
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert_eq!(
            Config::builder().threshold(10).build(),
            Err(Error::MissingClauses)
        );
        assert_eq!(
            Config::builder().clauses(4).threshold(0).build(),
            Err(Error::InvalidThreshold)
        );
        assert_eq!(
            Config::builder().clauses(4).threshold(i32::MAX).build(),
            Err(Error::InvalidThreshold)
        );
        assert!(Config::builder().clauses(4).threshold(MAX_THRESHOLD).build().is_ok());
        assert_eq!(
            Config::builder().clauses(4).threshold(5).specificity(1.0).build(),
            Err(Error::InvalidSpecificity {
                count: 1,
                depth: 1
            })
        );
        assert_eq!(
            Config::builder().clauses(4).threshold(5).message_size(2).build(),
            Err(Error::InvalidMessageSize(2))
        );
        assert_eq!(
            Config::builder().clauses(4).threshold(5).state_bits(1).build(),
            Err(Error::InvalidStateBits(1))
        );
        assert_eq!(
            Config::builder()
                .clauses(4)
                .threshold(5)
                .max_included_literals(0)
                .build(),
            Err(Error::InvalidMaxIncludedLiterals)
        );
    }

    #[test]
    fn double_hashing_forces_two_bits() {
        let config = Config::builder()
            .clauses(4)
            .threshold(5)
            .message_bits(5)
            .double_hashing(true)
            .build()
            .unwrap();

        assert_eq!(config.message_bits, 2);
    }

    #[test]
    fn prob_to_threshold_boundaries() {
        assert_eq!(prob_to_threshold(0.0), 0);
        assert_eq!(prob_to_threshold(1.0), u32::MAX);
        assert_eq!(prob_to_threshold(0.5), u32::MAX / 2);
    }
}
