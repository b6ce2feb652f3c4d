//! Noisy XOR over two-node graphs.
//!
//! Each graph has two nodes holding symbol A or B, linked both ways. The
//! label is 1 when the symbols differ. Run with `RUST_LOG=debug` to see
//! per-epoch progress.

use std::time::Instant;

use graph_tsetlin_rs::{
    Config, FitOptions, GraphSet, GraphSetBuilder, MultiClassGraphTsetlinMachine, utils::rng_from_seed
};
use rand::Rng;
use tracing_subscriber::EnvFilter;

const SYMBOLS: [&str; 2] = ["A", "B"];

fn graphs(n: usize, noise: f32, seed: u64) -> (GraphSet, Vec<usize>) {
    let mut rng = rng_from_seed(seed);
    let mut builder = GraphSetBuilder::new(SYMBOLS.len());
    let mut labels = Vec::with_capacity(n);

    for _ in 0..n {
        let x1 = rng.random_range(0..SYMBOLS.len());
        let x2 = rng.random_range(0..SYMBOLS.len());
        let g = builder.add_graph(2);
        builder
            .add_feature(g, 0, x1)
            .add_feature(g, 1, x2)
            .add_edge(g, 0, 1, 0)
            .add_edge(g, 1, 0, 0);

        let label = usize::from(x1 != x2);
        labels.push(if rng.random::<f32>() < noise { 1 - label } else { label });
    }
    (builder.build().expect("well-formed graphs"), labels)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (train, y_train) = graphs(10_000, 0.01, 1);
    let (test, y_test) = graphs(2_500, 0.0, 2);

    let config = Config::builder()
        .clauses(10)
        .threshold(100)
        .specificity(2.0)
        .depth(2)
        .message_size(16)
        .message_bits(2)
        .max_included_literals(4)
        .build()
        .expect("valid config");
    let mut tm = MultiClassGraphTsetlinMachine::new(config).expect("valid machine");

    let start = Instant::now();
    let result = tm
        .fit_with_options(
            &train,
            &y_train,
            FitOptions::new(10).with_callback(|epoch, acc| {
                println!("Epoch {epoch}: train accuracy {:.2}%", acc * 100.0);
                acc < 1.0
            })
        )
        .expect("training");
    println!("Trained {} epoch(s) in {:.2?}", result.epochs_run, start.elapsed());

    let accuracy = tm.evaluate(&test, &y_test).expect("evaluation");
    println!("Test accuracy: {:.2}%", accuracy * 100.0);

    let symbols: Vec<Vec<u32>> = (0..SYMBOLS.len() as u32).map(|k| vec![k]).collect();
    let literals = tm.clause_literals(&symbols).expect("trained machine");
    let state = tm.get_state().expect("trained machine");

    println!("\nClauses:");
    for (clause, row) in literals.iter().enumerate() {
        let mut terms = Vec::new();
        for (k, name) in SYMBOLS.iter().enumerate() {
            if row[k] == 1.0 {
                terms.push(name.to_string());
            }
            if row[SYMBOLS.len() + k] == 1.0 {
                terms.push(format!("NOT {name}"));
            }
        }
        let weights: Vec<i32> = (0..state.outputs)
            .map(|output| state.weights[output * state.clauses + clause])
            .collect();
        println!("  #{clause} {weights:?}: {}", terms.join(" AND "));
    }
}
