//! Integration tests for the Graph Tsetlin Machine.

use graph_tsetlin_rs::{
    Config, Error, GraphSet, GraphSetBuilder, MultiClassGraphTsetlinMachine,
    MultiOutputGraphTsetlinMachine, SingleOutputGraphTsetlinMachine, StateBank, utils::rng_from_seed
};
use rand::Rng;

const A: usize = 0;
const B: usize = 1;

/// Two nodes holding symbol A or B, linked both ways by one edge type.
/// Label is 1 when the symbols differ, flipped with probability `noise`.
fn noisy_xor_graphs(n: usize, noise: f32, seed: u64) -> (GraphSet, Vec<usize>) {
    let mut rng = rng_from_seed(seed);
    let mut builder = GraphSetBuilder::new(2);
    let mut labels = Vec::with_capacity(n);

    for _ in 0..n {
        let x1 = if rng.random::<bool>() { A } else { B };
        let x2 = if rng.random::<bool>() { A } else { B };
        let g = builder.add_graph(2);
        builder
            .add_feature(g, 0, x1)
            .add_feature(g, 1, x2)
            .add_edge(g, 0, 1, 0)
            .add_edge(g, 1, 0, 0);

        let mut label = usize::from(x1 != x2);
        if rng.random::<f32>() < noise {
            label = 1 - label;
        }
        labels.push(label);
    }
    (builder.build().unwrap(), labels)
}

fn xor_config(seed: u64) -> Config {
    Config::builder()
        .clauses(10)
        .threshold(100)
        .specificity(2.0)
        .depth(2)
        .message_size(16)
        .message_bits(2)
        .max_included_literals(4)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn noisy_xor_graph_learns() {
    let (train, y_train) = noisy_xor_graphs(5000, 0.01, 1);
    let (test, y_test) = noisy_xor_graphs(1000, 0.0, 2);

    let mut tm = MultiClassGraphTsetlinMachine::new(xor_config(42)).unwrap();
    tm.fit(&train, &y_train, 5, false).unwrap();

    let accuracy = tm.evaluate(&test, &y_test).unwrap();
    assert!(accuracy >= 0.9, "accuracy {accuracy}");
}

#[test]
fn incremental_fit_continues() {
    let (train, y_train) = noisy_xor_graphs(2000, 0.0, 3);
    let mut tm = MultiClassGraphTsetlinMachine::new(xor_config(5)).unwrap();

    assert_eq!(tm.fit(&train, &y_train, 1, true), Err(Error::NotInitialized));

    tm.fit(&train, &y_train, 1, false).unwrap();
    tm.fit(&train, &y_train, 4, true).unwrap();
    assert_eq!(tm.outputs(), Some(2));
    assert!(tm.evaluate(&train, &y_train).unwrap() > 0.5);
}

#[test]
fn cold_start_excludes_everything() {
    let (train, y_train) = noisy_xor_graphs(10, 0.0, 4);
    let config = Config::builder()
        .clauses(6)
        .threshold(10)
        .depth(3)
        .message_size(32)
        .build()
        .unwrap();
    let mut tm = MultiClassGraphTsetlinMachine::new(config).unwrap();
    tm.fit(&train, &y_train, 0, false).unwrap();

    for depth in 0..3 {
        let literals = tm.hyperliterals(depth).unwrap();
        assert!(literals.iter().flatten().all(|&a| a == 0), "depth {depth}");
    }

    // every clause holds vacuously at every node
    let t = tm.transform(&train).unwrap();
    assert!(t.clause_outputs.iter().flatten().all(|&c| c == 2));
}

#[test]
fn state_roundtrip_reproduces_scores() {
    let (train, y_train) = noisy_xor_graphs(500, 0.05, 6);
    let mut tm = MultiClassGraphTsetlinMachine::new(xor_config(9)).unwrap();
    tm.fit(&train, &y_train, 3, false).unwrap();

    let before = tm.score(&train).unwrap();
    let state = tm.get_state().unwrap();

    tm.set_state(state.clone()).unwrap();
    assert_eq!(tm.score(&train).unwrap(), before);

    // a machine with another seed and the same shape reproduces them too
    let mut other = MultiClassGraphTsetlinMachine::new(xor_config(1234)).unwrap();
    other.set_state(state).unwrap();
    assert_eq!(other.score(&train).unwrap(), before);
}

#[test]
fn score_reports_raw_sums() {
    let (train, y_train) = noisy_xor_graphs(20, 0.0, 7);
    let mut tm = MultiClassGraphTsetlinMachine::new(xor_config(3)).unwrap();
    tm.fit(&train, &y_train, 0, false).unwrap();

    // cold clauses hold everywhere, so every weight is counted
    let mut state = tm.get_state().unwrap();
    state.weights.iter_mut().for_each(|w| *w = 50);
    tm.set_state(state).unwrap();

    let threshold = tm.config().threshold;
    for sums in tm.score(&train).unwrap() {
        assert_eq!(sums, vec![500, 500]);
        assert!(sums.iter().all(|&s| s > threshold));
    }
}

#[test]
fn zero_edge_graphs_receive_nothing() {
    let mut builder = GraphSetBuilder::new(2);
    for i in 0..6 {
        let g = builder.add_graph(3);
        builder.add_feature(g, i % 3, i % 2);
    }
    let graphs = builder.build().unwrap();
    let labels = vec![0, 1, 0, 1, 0, 1];

    let config = Config::builder()
        .clauses(4)
        .threshold(10)
        .specificity(3.0)
        .depth(3)
        .message_size(8)
        .build()
        .unwrap();
    let mut tm = MultiClassGraphTsetlinMachine::new(config).unwrap();
    tm.fit(&graphs, &labels, 3, false).unwrap();
    assert_eq!(tm.score(&graphs).unwrap().len(), 6);

    // require "message position 0 present" in round one for clause 0 and
    // "position 0 absent" for clause 1; clear every other literal
    tm.fit(&graphs, &labels, 0, false).unwrap();
    let mut state = tm.get_state().unwrap();
    let mut bank = StateBank::from_words(4, 16, 8, state.message_states[0].clone()).unwrap();
    bank.set_state(0, 0, 255);
    bank.set_state(1, 8, 255);
    state.message_states[0] = bank.words().to_vec();
    tm.set_state(state).unwrap();

    let t = tm.transform(&graphs).unwrap();
    for counts in &t.clause_outputs {
        assert_eq!(counts[0], 0, "nothing is ever received");
        assert_eq!(counts[1], 3, "absence holds at every node");
        assert_eq!(counts[2], 3);
    }
}

#[test]
fn multi_output_matches_multiclass_on_binary_labels() {
    let (train, y_train) = noisy_xor_graphs(1000, 0.02, 8);
    let one_hot: Vec<Vec<u8>> = y_train
        .iter()
        .map(|&y| if y == 0 { vec![1, 0] } else { vec![0, 1] })
        .collect();

    let mut mc = MultiClassGraphTsetlinMachine::new(xor_config(11)).unwrap();
    let mut mo = MultiOutputGraphTsetlinMachine::new(xor_config(11)).unwrap();
    mc.fit(&train, &y_train, 3, false).unwrap();
    mo.fit(&train, &one_hot, 3, false).unwrap();

    assert_eq!(mc.score(&train).unwrap(), mo.score(&train).unwrap());

    let classes = mc.predict(&train).unwrap();
    let outputs = mo.predict(&train).unwrap();
    for (class, bits) in classes.iter().zip(&outputs) {
        if bits.iter().sum::<u8>() == 1 {
            assert_eq!(bits[*class], 1);
        }
    }
}

#[test]
fn single_output_learns_xor() {
    let (train, y_train) = noisy_xor_graphs(3000, 0.0, 12);
    let (test, y_test) = noisy_xor_graphs(500, 0.0, 13);
    let y_train: Vec<u8> = y_train.iter().map(|&y| y as u8).collect();
    let y_test: Vec<u8> = y_test.iter().map(|&y| y as u8).collect();

    let mut tm = SingleOutputGraphTsetlinMachine::new(xor_config(21)).unwrap();
    tm.fit(&train, &y_train, 5, false).unwrap();

    assert!(tm.evaluate(&test, &y_test).unwrap() >= 0.8);
}

#[test]
fn interpretation_shapes() {
    let (train, y_train) = noisy_xor_graphs(500, 0.0, 14);
    let mut tm = MultiClassGraphTsetlinMachine::new(xor_config(15)).unwrap();
    tm.fit(&train, &y_train, 2, false).unwrap();

    let symbols = vec![vec![0u32], vec![1u32]];
    let clause_literals = tm.clause_literals(&symbols).unwrap();
    assert_eq!(clause_literals.len(), 10);
    assert!(clause_literals.iter().all(|row| row.len() == 4));
    for (clause, row) in clause_literals.iter().enumerate() {
        assert_eq!(row[0] == 1.0, tm.ta_action(0, clause, 0).unwrap());
        assert_eq!(row[3] == 1.0, tm.ta_action(0, clause, 3).unwrap());
    }

    let messages = tm.message_literals(1, 1).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].len(), 10);
    assert!(messages[0].iter().all(|row| row.len() == 20));
    assert!(messages[0].iter().flatten().all(|&v| (0.0..=1.0).contains(&v)));

    assert!(matches!(
        tm.message_literals(0, 1),
        Err(Error::DimensionMismatch {
            what: "message depth",
            got: 0,
            ..
        })
    ));
    assert!(tm.ta_action(2, 0, 0).is_err());
    assert!(tm.clause_literals(&[vec![7]]).is_err());
}

#[test]
fn early_stop_ends_training() {
    use graph_tsetlin_rs::FitOptions;

    let (train, y_train) = noisy_xor_graphs(300, 0.0, 16);
    let mut tm = MultiClassGraphTsetlinMachine::new(xor_config(17)).unwrap();
    let options = FitOptions::new(200).with_early_stop(2, 0.5);

    let result = tm.fit_with_options(&train, &y_train, options).unwrap();
    assert!(result.stopped_early);
    assert!(result.epochs_run < 200);
    assert_eq!(result.history.len(), result.epochs_run);
}

#[test]
fn double_hashing_machine_trains() {
    let (train, y_train) = noisy_xor_graphs(1000, 0.0, 18);
    let config = Config::builder()
        .clauses(10)
        .threshold(100)
        .specificity(2.0)
        .depth(2)
        .message_size(16)
        .double_hashing(true)
        .seed(19)
        .build()
        .unwrap();
    let mut tm = MultiClassGraphTsetlinMachine::new(config).unwrap();
    assert_eq!(tm.hypervectors().message_bits(), 2);

    tm.fit(&train, &y_train, 3, false).unwrap();
    let scores = tm.score(&train).unwrap();
    assert_eq!(scores.len(), 1000);
    assert!(scores.iter().all(|sums| sums.len() == 2));
    assert_eq!(tm.message_literals(1, 1).unwrap()[0].len(), 10);

    let state = tm.get_state().unwrap();
    tm.set_state(state).unwrap();
    assert_eq!(tm.score(&train).unwrap(), scores);
}
