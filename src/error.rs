//! Error types for the Graph Tsetlin Machine.

use thiserror::Error;

/// # Overview
///
/// Errors raised when building, training or querying a machine.
///
/// Configuration errors come from [`crate::ConfigBuilder::build`]; the rest
/// are precondition violations detected before any automaton is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("number of clauses must be > 0")]
    MissingClauses,
    #[error("threshold T must be in 1..=i32::MAX / 2")]
    InvalidThreshold,
    #[error("s must be > 1.0 for every depth (got {count} value(s) for depth {depth})")]
    InvalidSpecificity { count: usize, depth: usize },
    #[error("state bits must be in 2..=31, got {0}")]
    InvalidStateBits(u8),
    #[error("depth must be >= 1")]
    InvalidDepth,
    #[error("message size must be >= 3, got {0}")]
    InvalidMessageSize(usize),
    #[error("message bits must be in 1..=message_size, got {0}")]
    InvalidMessageBits(usize),
    #[error("max included literals must be > 0")]
    InvalidMaxIncludedLiterals,
    #[error("q must be > 0")]
    InvalidQ,
    #[error("model not initialized: fit a graph set first")]
    NotInitialized,
    #[error("{what} mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        what:     &'static str,
        expected: usize,
        got:      usize
    },
    #[error("graph {graph} has no nodes")]
    EmptyGraph { graph: usize },
    #[error("invalid graph set: {0}")]
    InvalidGraph(String),
    #[error("dataset cannot be empty")]
    EmptyDataset,
    #[error("label {label} of example {example} is invalid")]
    InvalidLabel { example: usize, label: usize },
    #[error("invalid machine state: {0}")]
    InvalidState(String)
}

/// # Overview
///
/// Result type for Graph Tsetlin Machine operations.
pub type Result<T> = core::result::Result<T, Error>;
