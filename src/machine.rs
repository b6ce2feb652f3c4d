//! The Graph Tsetlin Machine orchestrator.
//!
//! One engine serves every label flavour; the [`LabelCodec`] parameter only
//! decides how labels become `±T` targets and how class sums become
//! predictions.
//!
//! Per training example the pipeline is strictly sequential:
//!
//! ```text
//! surface evaluation -> message rounds -> class sum
//!     -> representative nodes -> clause updates -> automata (all layers)
//! ```
//!
//! Examples are visited in order and each sees the updates of the previous
//! one.

use core::marker::PhantomData;
use std::time::Instant;

use rand::Rng;
use tracing::{debug, info};

use crate::{
    Config, Error, GraphSet, Hypervectors, Result,
    automaton::StateBank,
    codec::{LabelCodec, MultiClass, MultiOutput, SingleOutput},
    evaluate::{
        ClauseNodeOutput, accumulate_class_sum, clause_counts, clause_node_matrix,
        evaluate_clause_node_output, select_clause_node
    },
    feedback::{FeedbackParams, select_clause_updates, update_bank},
    graphs::GraphRef,
    message::{MessageBuffers, propagate},
    state::MachineState,
    training::{EarlyStopTracker, FitOptions, FitResult},
    utils::{FastRng, rng_from_seed}
};

/// Multi-class machine: one label per graph, arg-max readout.
pub type MultiClassGraphTsetlinMachine = GraphTsetlinMachine<MultiClass>;
/// Multi-output machine: one binary label per output.
pub type MultiOutputGraphTsetlinMachine = GraphTsetlinMachine<MultiOutput>;
/// Single binary output.
pub type SingleOutputGraphTsetlinMachine = GraphTsetlinMachine<SingleOutput>;

/// Automata and weights, sized from the first graph set seen.
#[derive(Debug, Clone)]
pub(crate) struct Model {
    pub(crate) clause_bank:   StateBank,
    pub(crate) message_banks: Vec<StateBank>,
    pub(crate) weights:       Vec<i32>,
    pub(crate) outputs:       usize,
    pub(crate) features:      usize
}

impl Model {
    fn new<R: Rng>(config: &Config, features: usize, outputs: usize, rng: &mut R) -> Self {
        let message_banks = (1..config.depth)
            .map(|_| StateBank::new(config.clauses, 2 * config.message_size, config.state_bits))
            .collect();
        let mut model = Self {
            clause_bank: StateBank::new(config.clauses, 2 * features, config.state_bits),
            message_banks,
            weights: vec![0; outputs * config.clauses],
            outputs,
            features
        };
        model.randomize_weights(rng);
        model
    }

    /// Puts every automaton back to the cold state and redraws weights.
    fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.clause_bank.initialize();
        for bank in &mut self.message_banks {
            bank.initialize();
        }
        self.randomize_weights(rng);
    }

    fn randomize_weights<R: Rng>(&mut self, rng: &mut R) {
        for w in &mut self.weights {
            *w = if rng.random::<bool>() { 1 } else { -1 };
        }
    }

    #[inline]
    pub(crate) fn clauses(&self) -> usize {
        self.clause_bank.clauses()
    }

    pub(crate) fn check(&self, graphs: &GraphSet) -> Result<()> {
        if graphs.number_of_features() != self.features {
            return Err(Error::DimensionMismatch {
                what:     "node features",
                expected: self.features,
                got:      graphs.number_of_features()
            });
        }
        Ok(())
    }

    fn feedback_params(&self, config: &Config) -> FeedbackParams {
        FeedbackParams {
            threshold:             config.threshold,
            q:                     config.q,
            max_included_literals: config
                .max_included_literals
                .unwrap_or(self.clause_bank.literals()),
            boost:                 config.boost_true_positive_feedback
        }
    }

    /// Evaluates one graph: surface layer, message rounds, class sums.
    ///
    /// Leaves the last round's clause outputs in `ws.current` and the raw
    /// sums in `ws.class_sum`.
    pub(crate) fn forward(
        &self,
        hypervectors: &Hypervectors,
        graph: GraphRef<'_>,
        ws: &mut Workspace
    ) {
        evaluate_clause_node_output(
            &self.clause_bank,
            graph.x,
            graph.nodes,
            &mut ws.current,
            &mut ws.include_counts[0]
        );
        propagate(
            &self.message_banks,
            hypervectors,
            graph,
            &mut ws.buffers,
            &mut ws.current,
            &mut ws.next,
            &mut ws.include_counts
        );
        ws.class_sum.fill(0);
        accumulate_class_sum(&ws.current, &self.weights, graph.nodes, &mut ws.class_sum);
    }

    /// Forward pass plus every feedback phase for one training example.
    #[allow(clippy::too_many_arguments)]
    fn learn<R: Rng>(
        &mut self,
        config: &Config,
        params: &FeedbackParams,
        hypervectors: &Hypervectors,
        rng: &mut R,
        graph: GraphRef<'_>,
        ws: &mut Workspace,
        targets: &[i32]
    ) {
        self.forward(hypervectors, graph, ws);
        select_clause_node(&ws.current, graph.nodes, rng, &mut ws.clause_node);
        select_clause_updates(
            rng,
            params,
            &mut self.weights,
            &ws.class_sum,
            targets,
            &ws.clause_node,
            &mut ws.class_clause_update
        );
        update_bank(
            rng,
            params,
            &mut self.clause_bank,
            config.s_at(0),
            graph.x,
            &ws.clause_node,
            &ws.include_counts[0],
            &ws.class_clause_update
        );
        for (layer, bank) in self.message_banks.iter_mut().enumerate() {
            update_bank(
                rng,
                params,
                bank,
                config.s_at(layer + 1),
                ws.buffers.encoded(layer),
                &ws.clause_node,
                &ws.include_counts[layer + 1],
                &ws.class_clause_update
            );
        }
    }
}

/// Per graph-set scratch buffers, reused across examples and epochs.
#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    signature:                      u64,
    outputs:                        usize,
    pub(crate) current:             ClauseNodeOutput,
    pub(crate) next:                ClauseNodeOutput,
    pub(crate) buffers:             MessageBuffers,
    pub(crate) include_counts:      Vec<Vec<usize>>,
    pub(crate) clause_node:         Vec<Option<usize>>,
    pub(crate) class_sum:           Vec<i32>,
    pub(crate) class_clause_update: Vec<i32>
}

impl Workspace {
    pub(crate) fn new(config: &Config, outputs: usize, graphs: &GraphSet) -> Self {
        let clauses = config.clauses;
        let max_nodes = graphs.max_number_of_graph_nodes();
        Self {
            signature: graphs.signature(),
            outputs,
            current: ClauseNodeOutput::new(clauses, max_nodes),
            next: ClauseNodeOutput::new(clauses, max_nodes),
            buffers: MessageBuffers::new(config.depth - 1, config.message_size, max_nodes),
            include_counts: vec![vec![0; clauses]; config.depth],
            clause_node: vec![None; clauses],
            class_sum: vec![0; outputs],
            class_clause_update: vec![0; outputs * clauses]
        }
    }

    fn serves(&self, graphs: &GraphSet, outputs: usize) -> bool {
        self.signature == graphs.signature()
            && self.outputs == outputs
            && self.buffers.max_nodes() >= graphs.max_number_of_graph_nodes()
    }
}

/// Returns the cached workspace for `graphs`, reallocating on a new set.
fn workspace<'a>(
    slot: &'a mut Option<Workspace>,
    config: &Config,
    outputs: usize,
    graphs: &GraphSet
) -> &'a mut Workspace {
    if !slot.as_ref().is_some_and(|ws| ws.serves(graphs, outputs)) {
        info!(
            graphs = graphs.number_of_graphs(),
            max_nodes = graphs.max_number_of_graph_nodes(),
            "allocating buffers for graph set"
        );
        *slot = Some(Workspace::new(config, outputs, graphs));
    }
    slot.get_or_insert_with(|| Workspace::new(config, outputs, graphs))
}

/// Clause outputs aggregated per graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    /// `[example][clause]`: number of nodes where the clause holds.
    pub clause_outputs: Vec<Vec<i32>>,
    /// `[example][output]` raw class sums.
    pub class_sums:     Vec<Vec<i32>>
}

/// Clause outputs per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodewiseTransformed {
    /// `[example][clause][node]` 0/1, padded to the largest graph.
    pub clause_outputs: Vec<Vec<Vec<i32>>>,
    /// `[example][output]` raw class sums.
    pub class_sums:     Vec<Vec<i32>>
}

/// # Overview
///
/// Graph Tsetlin Machine parameterised by its label encoding.
///
/// The machine starts uninitialized; the first non-incremental
/// [`fit`](Self::fit) sizes the automata from the graph set and labels.
///
/// # Examples
///
/// ```
/// use graph_tsetlin_rs::{Config, GraphSetBuilder, MultiClassGraphTsetlinMachine};
///
/// let mut builder = GraphSetBuilder::new(2);
/// for label in 0..2 {
///     let g = builder.add_graph(2);
///     builder.add_feature(g, 0, label).add_edge(g, 0, 1, 0);
/// }
/// let graphs = builder.build().unwrap();
///
/// let config = Config::builder()
///     .clauses(4)
///     .threshold(10)
///     .specificity(3.0)
///     .depth(2)
///     .message_size(16)
///     .build()
///     .unwrap();
/// let mut tm = MultiClassGraphTsetlinMachine::new(config).unwrap();
///
/// tm.fit(&graphs, &[0, 1], 5, false).unwrap();
/// assert_eq!(tm.predict(&graphs).unwrap().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct GraphTsetlinMachine<C: LabelCodec> {
    pub(crate) config:       Config,
    rng:                     FastRng,
    pub(crate) hypervectors: Hypervectors,
    pub(crate) model:        Option<Model>,
    train:                   Option<Workspace>,
    test:                    Option<Workspace>,
    codec:                   PhantomData<fn() -> C>
}

impl<C: LabelCodec> GraphTsetlinMachine<C> {
    /// # Overview
    ///
    /// Validates the configuration, seeds the RNG and draws the clause
    /// hypervectors.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let mut rng = rng_from_seed(config.seed);
        let hypervectors = if config.double_hashing {
            Hypervectors::double_hashing(config.clauses, config.message_size)
        } else {
            Hypervectors::random(
                config.clauses,
                config.message_size,
                config.message_bits,
                &mut rng
            )
        };
        info!(
            clauses = config.clauses,
            depth = config.depth,
            message_size = config.message_size,
            "initialization of sparse structure"
        );

        Ok(Self {
            config,
            rng,
            hypervectors,
            model: None,
            train: None,
            test: None,
            codec: PhantomData
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn hypervectors(&self) -> &Hypervectors {
        &self.hypervectors
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    /// Number of outputs, once initialized.
    #[inline]
    pub fn outputs(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.outputs)
    }

    pub(crate) fn model(&self) -> Result<&Model> {
        self.model.as_ref().ok_or(Error::NotInitialized)
    }

    /// # Overview
    ///
    /// Trains for `epochs` epochs.
    ///
    /// With `incremental = false` the automata and weights start from the
    /// cold state; with `true` training continues from the current model.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] for an incremental fit on a fresh machine
    /// - [`Error::DimensionMismatch`] when labels or node features disagree
    ///   with the graph set or the model
    /// - [`Error::InvalidLabel`] for labels the codec cannot encode
    pub fn fit(
        &mut self,
        graphs: &GraphSet,
        labels: &[C::Label],
        epochs: usize,
        incremental: bool
    ) -> Result<()> {
        let options = FitOptions {
            epochs,
            incremental,
            ..FitOptions::default()
        };
        self.fit_with_options(graphs, labels, options).map(|_| ())
    }

    /// # Overview
    ///
    /// Trains with epoch callback and early stopping.
    ///
    /// Training-set accuracy is measured after each epoch only when a
    /// callback or early stopping is configured.
    pub fn fit_with_options(
        &mut self,
        graphs: &GraphSet,
        labels: &[C::Label],
        mut options: FitOptions
    ) -> Result<FitResult> {
        if labels.len() != graphs.number_of_graphs() {
            return Err(Error::DimensionMismatch {
                what:     "labels",
                expected: graphs.number_of_graphs(),
                got:      labels.len()
            });
        }

        let outputs = match (&self.model, options.incremental) {
            (Some(model), true) => {
                model.check(graphs)?;
                model.outputs
            }
            (None, true) => return Err(Error::NotInitialized),
            (_, false) => C::outputs(labels)?
        };
        let targets = C::encode_all(labels, outputs, self.config.threshold)?;
        if !options.incremental {
            self.initialize(graphs.number_of_features(), outputs);
        }

        let mut tracker = options.early_stop.as_ref().map(EarlyStopTracker::new);
        let mut result = FitResult::default();

        for epoch in 0..options.epochs {
            let start = Instant::now();
            self.train_epoch(graphs, &targets, outputs)?;
            result.epochs_run = epoch + 1;

            if !options.monitored() {
                debug!(epoch, elapsed_ms = start.elapsed().as_millis() as u64, "epoch complete");
                continue;
            }

            let accuracy = self.evaluate(graphs, labels)?;
            result.history.push(accuracy);
            result.final_accuracy = Some(accuracy);
            debug!(epoch, accuracy, elapsed_ms = start.elapsed().as_millis() as u64, "epoch complete");

            let keep_going = options.callback.as_mut().is_none_or(|cb| cb(epoch, accuracy));
            let plateau = tracker.as_mut().is_some_and(|t| t.update(accuracy));
            if !keep_going || plateau {
                result.stopped_early = true;
                break;
            }
        }

        Ok(result)
    }

    /// Builds a cold model, reusing the allocation when the shape matches.
    fn initialize(&mut self, features: usize, outputs: usize) {
        match self.model.as_mut() {
            Some(model) if model.features == features && model.outputs == outputs => {
                info!("resetting automata and weights");
                model.reset(&mut self.rng);
            }
            _ => {
                info!(features, outputs, clauses = self.config.clauses, "initializing model");
                self.model = Some(Model::new(&self.config, features, outputs, &mut self.rng));
                self.train = None;
                self.test = None;
            }
        }
    }

    fn train_epoch(&mut self, graphs: &GraphSet, targets: &[i32], outputs: usize) -> Result<()> {
        let Self {
            config,
            rng,
            hypervectors,
            model,
            train,
            ..
        } = self;
        let model = model.as_mut().ok_or(Error::NotInitialized)?;
        model.check(graphs)?;
        let params = model.feedback_params(config);
        let ws = workspace(train, config, outputs, graphs);

        for (e, y) in targets.chunks_exact(outputs).enumerate() {
            model.learn(config, &params, hypervectors, rng, graphs.graph(e), ws, y);
        }
        Ok(())
    }

    /// Runs the forward pass over every graph, handing the workspace of
    /// each to `visit`.
    fn infer<F>(&mut self, graphs: &GraphSet, mut visit: F) -> Result<()>
    where
        F: FnMut(&Workspace, usize)
    {
        let Self {
            config,
            hypervectors,
            model,
            test,
            ..
        } = self;
        let model = model.as_ref().ok_or(Error::NotInitialized)?;
        model.check(graphs)?;
        let ws = workspace(test, config, model.outputs, graphs);

        for e in 0..graphs.number_of_graphs() {
            let graph = graphs.graph(e);
            model.forward(hypervectors, graph, ws);
            visit(ws, graph.nodes);
        }
        Ok(())
    }

    /// # Overview
    ///
    /// Raw class sums per example, `[example][output]`.
    ///
    /// Sums are not clipped; clipping to `[-T, T]` only happens inside
    /// feedback.
    pub fn score(&mut self, graphs: &GraphSet) -> Result<Vec<Vec<i32>>> {
        let mut scores = Vec::with_capacity(graphs.number_of_graphs());
        self.infer(graphs, |ws, _| scores.push(ws.class_sum.clone()))?;
        Ok(scores)
    }

    /// Decodes the class sums of every example.
    pub fn predict(&mut self, graphs: &GraphSet) -> Result<Vec<C::Prediction>> {
        let mut predictions = Vec::with_capacity(graphs.number_of_graphs());
        self.infer(graphs, |ws, _| predictions.push(C::decode(&ws.class_sum)))?;
        Ok(predictions)
    }

    /// Fraction of examples predicted correctly.
    pub fn evaluate(&mut self, graphs: &GraphSet, labels: &[C::Label]) -> Result<f32> {
        if labels.len() != graphs.number_of_graphs() {
            return Err(Error::DimensionMismatch {
                what:     "labels",
                expected: graphs.number_of_graphs(),
                got:      labels.len()
            });
        }
        let predictions = self.predict(graphs)?;
        let correct = predictions
            .iter()
            .zip(labels)
            .filter(|(p, y)| C::is_correct(p, y))
            .count();
        Ok(correct as f32 / labels.len() as f32)
    }

    /// # Overview
    ///
    /// Per-clause satisfying-node counts of the final round, with the class
    /// sums of each example.
    pub fn transform(&mut self, graphs: &GraphSet) -> Result<Transformed> {
        let n = graphs.number_of_graphs();
        let mut clause_outputs = Vec::with_capacity(n);
        let mut class_sums = Vec::with_capacity(n);
        self.infer(graphs, |ws, nodes| {
            clause_outputs.push(clause_counts(&ws.current, nodes));
            class_sums.push(ws.class_sum.clone());
        })?;
        Ok(Transformed {
            clause_outputs,
            class_sums
        })
    }

    /// Like [`transform`](Self::transform) but keeps one 0/1 entry per node.
    pub fn transform_nodewise(&mut self, graphs: &GraphSet) -> Result<NodewiseTransformed> {
        let n = graphs.number_of_graphs();
        let width = graphs.max_number_of_graph_nodes();
        let mut clause_outputs = Vec::with_capacity(n);
        let mut class_sums = Vec::with_capacity(n);
        self.infer(graphs, |ws, nodes| {
            clause_outputs.push(clause_node_matrix(&ws.current, nodes, width));
            class_sums.push(ws.class_sum.clone());
        })?;
        Ok(NodewiseTransformed {
            clause_outputs,
            class_sums
        })
    }

    /// # Overview
    ///
    /// Snapshot of automata, weights and shape metadata.
    pub fn get_state(&self) -> Result<MachineState> {
        let model = self.model()?;
        Ok(MachineState {
            clause_states:  model.clause_bank.words().to_vec(),
            message_states: model
                .message_banks
                .iter()
                .map(|bank| bank.words().to_vec())
                .collect(),
            weights:        model.weights.clone(),
            outputs:        model.outputs,
            clauses:        model.clauses(),
            literals:       model.clause_bank.literals(),
            depth:          self.config.depth,
            state_bits:     model.clause_bank.state_bits() as u8,
            ta_chunks:      model.clause_bank.chunks(),
            message_size:   self.config.message_size,
            hypervectors:   self.hypervectors.clone()
        })
    }

    /// # Overview
    ///
    /// Restores a snapshot taken by [`get_state`](Self::get_state).
    ///
    /// Clause count, depth, state bits and message size must match this
    /// machine's configuration. Cached buffers are dropped.
    pub fn set_state(&mut self, state: MachineState) -> Result<()> {
        state.validate()?;
        let config = &self.config;
        if state.clauses != config.clauses
            || state.depth != config.depth
            || state.state_bits != config.state_bits
            || state.message_size != config.message_size
        {
            return Err(Error::InvalidState(format!(
                "state shape (clauses {}, depth {}, bits {}, message size {}) \
                 does not match configuration",
                state.clauses, state.depth, state.state_bits, state.message_size
            )));
        }

        let clause_bank =
            StateBank::from_words(state.clauses, state.literals, state.state_bits, state.clause_states)?;
        let message_banks = state
            .message_states
            .into_iter()
            .map(|words| {
                StateBank::from_words(
                    state.clauses,
                    2 * state.message_size,
                    state.state_bits,
                    words
                )
            })
            .collect::<Result<Vec<_>>>()?;

        self.model = Some(Model {
            clause_bank,
            message_banks,
            weights: state.weights,
            outputs: state.outputs,
            features: state.literals / 2
        });
        self.hypervectors = state.hypervectors;
        self.train = None;
        self.test = None;
        Ok(())
    }
}
