//! # Graph Tsetlin Machine
//!
//! Rust implementation of the Graph Tsetlin Machine: clauses of Tsetlin
//! automata evaluated at every node of a graph, with several rounds of
//! hypervector message passing along typed edges.
//!
//! # Features
//!
//! - `parallel`: parallel inference across examples via rayon
//! - `serde`: serialization of configs, graph sets and machine state
//!
//! # Examples
//!
//! ```
//! use graph_tsetlin_rs::{Config, GraphSetBuilder, SingleOutputGraphTsetlinMachine};
//!
//! // two-node graphs, feature 0 = "A", feature 1 = "B"
//! let mut builder = GraphSetBuilder::new(2);
//! let mut labels = Vec::new();
//! for (a, b) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
//!     let g = builder.add_graph(2);
//!     builder
//!         .add_feature(g, 0, a)
//!         .add_feature(g, 1, b)
//!         .add_edge(g, 0, 1, 0)
//!         .add_edge(g, 1, 0, 0);
//!     labels.push(u8::from(a != b));
//! }
//! let graphs = builder.build().unwrap();
//!
//! let config = Config::builder()
//!     .clauses(10)
//!     .threshold(20)
//!     .specificity(2.0)
//!     .depth(2)
//!     .message_size(16)
//!     .build()
//!     .unwrap();
//!
//! let mut tm = SingleOutputGraphTsetlinMachine::new(config).unwrap();
//! tm.fit(&graphs, &labels, 10, false).unwrap();
//!
//! let scores = tm.score(&graphs).unwrap();
//! assert_eq!(scores.len(), 4);
//! ```

mod automaton;
mod codec;
mod config;
pub mod error;
pub mod evaluate;
pub mod feedback;
mod graphs;
mod hypervector;
mod interpret;
mod machine;
pub mod message;
mod state;
mod training;
pub mod utils;

#[cfg(feature = "parallel")]
pub mod parallel;

pub use automaton::{CHUNK_BITS, StateBank};
pub use codec::{LabelCodec, MultiClass, MultiOutput, SingleOutput};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use graphs::{Edge, GraphRef, GraphSet, GraphSetBuilder};
pub use hypervector::Hypervectors;
pub use machine::{
    GraphTsetlinMachine, MultiClassGraphTsetlinMachine, MultiOutputGraphTsetlinMachine,
    NodewiseTransformed, SingleOutputGraphTsetlinMachine, Transformed
};
pub use state::MachineState;
pub use training::{EarlyStop, FitOptions, FitResult, ProgressCallback};
