//! Benchmarks for Graph Tsetlin Machine operations.

use core::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use graph_tsetlin_rs::{
    Config, GraphSet, GraphSetBuilder, Hypervectors, MultiClassGraphTsetlinMachine, StateBank,
    evaluate::{ClauseNodeOutput, evaluate_clause_node_output},
    message::{MessageBuffers, propagate},
    utils::rng_from_seed
};

/// Ring graphs of `nodes` nodes with one feature set per node.
fn ring_graphs(count: usize, nodes: usize, features: usize) -> (GraphSet, Vec<usize>) {
    let mut builder = GraphSetBuilder::new(features);
    let mut labels = Vec::with_capacity(count);
    for i in 0..count {
        let g = builder.add_graph(nodes);
        for node in 0..nodes {
            builder
                .add_feature(g, node, (i + node) % features)
                .add_edge(g, node, (node + 1) % nodes, 0);
        }
        labels.push(i % 2);
    }
    (builder.build().unwrap(), labels)
}

fn bench_surface_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("surface_evaluate");

    for clauses in [16, 64, 256] {
        let (graphs, _) = ring_graphs(1, 32, 64);
        let graph = graphs.graph(0);
        let mut bank = StateBank::new(clauses, graphs.literals(), 8);
        for clause in 0..clauses {
            bank.increment(clause, clause % graphs.literals());
        }
        let mut output = ClauseNodeOutput::new(clauses, 32);
        let mut counts = vec![0; clauses];

        group.bench_with_input(BenchmarkId::from_parameter(clauses), &clauses, |b, _| {
            b.iter(|| {
                evaluate_clause_node_output(
                    black_box(&bank),
                    black_box(graph.x),
                    graph.nodes,
                    &mut output,
                    &mut counts
                );
            });
        });
    }

    group.finish();
}

fn bench_message_rounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_rounds");

    for depth in [2, 3, 4] {
        let clauses = 64;
        let (graphs, _) = ring_graphs(1, 32, 16);
        let graph = graphs.graph(0);
        let mut rng = rng_from_seed(42);
        let hv = Hypervectors::random(clauses, 256, 2, &mut rng);
        let banks: Vec<StateBank> = (1..depth).map(|_| StateBank::new(clauses, 512, 8)).collect();
        let mut buffers = MessageBuffers::new(depth - 1, 256, 32);
        let mut counts = vec![vec![0; clauses]; depth];

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let mut current = ClauseNodeOutput::new(clauses, 32);
                let mut next = ClauseNodeOutput::new(clauses, 32);
                for node in 0..32 {
                    current.set(node % clauses, node, true);
                }
                propagate(
                    black_box(&banks),
                    &hv,
                    graph,
                    &mut buffers,
                    &mut current,
                    &mut next,
                    &mut counts
                );
                black_box(current)
            });
        });
    }

    group.finish();
}

fn bench_fit_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_epoch");
    group.sample_size(10);

    for clauses in [20, 100] {
        let (graphs, labels) = ring_graphs(200, 8, 16);
        let config = Config::builder()
            .clauses(clauses)
            .threshold(50)
            .specificity(3.0)
            .depth(2)
            .message_size(64)
            .build()
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(clauses), &clauses, |b, _| {
            b.iter(|| {
                let mut tm = MultiClassGraphTsetlinMachine::new(config.clone()).unwrap();
                tm.fit(&graphs, &labels, 1, false).unwrap();
                black_box(tm)
            });
        });
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for nodes in [4, 16, 64] {
        let (graphs, labels) = ring_graphs(100, nodes, 16);
        let config = Config::builder()
            .clauses(50)
            .threshold(50)
            .depth(2)
            .message_size(64)
            .build()
            .unwrap();
        let mut tm = MultiClassGraphTsetlinMachine::new(config).unwrap();
        tm.fit(&graphs, &labels, 1, false).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |b, _| {
            b.iter(|| black_box(tm.score(black_box(&graphs)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_surface_evaluate,
    bench_message_rounds,
    bench_fit_epoch,
    bench_score
);
criterion_main!(benches);
