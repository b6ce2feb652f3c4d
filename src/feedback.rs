//! Type I and Type II feedback for graph clauses.
//!
//! Learning for one example runs in two passes:
//!
//! 1. [`select_clause_updates`] decides, per (output, clause), whether the
//!    clause is reinforced (`+1`, Type I), corrected (`-1`, Type II) or left
//!    alone (`0`), and moves the clause weight accordingly.
//! 2. [`update_bank`] applies that decision to the automata of one layer,
//!    using the literals found at the clause's representative node. Surface
//!    and message layers share the same decisions, so all automata of a
//!    clause move together for a given example.
//!
//! # Update probability
//!
//! ```text
//! clipped = clip(class_sum, -T, T)
//! target  = +1 unless clipped > y, else -1        (y = +T or -T)
//! p       = |y - clipped| / 2T
//! update  = target * sign(weight)   with probability p
//! ```

use rand::Rng;

use crate::{
    automaton::StateBank,
    config::prob_to_threshold,
    utils::random_mask
};

/// Parameters shared by every feedback call of a machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackParams {
    /// Voting threshold T.
    pub threshold:             i32,
    /// Selection rate for negative targets.
    pub q:                     f32,
    /// Include actions above which Type I only weakens.
    pub max_included_literals: usize,
    /// Strengthen present literals without random thinning.
    pub boost:                 bool
}

/// # Overview
///
/// Chooses the feedback type per (output, clause) and updates weights.
///
/// `weights` and `class_clause_update` are laid out `[output][clause]`;
/// `targets` holds the encoded `±T` target of each output for this example.
/// Weights only move for clauses with a representative node, and saturate
/// at the `i32` range.
pub fn select_clause_updates<R: Rng>(
    rng: &mut R,
    params: &FeedbackParams,
    weights: &mut [i32],
    class_sum: &[i32],
    targets: &[i32],
    clause_node: &[Option<usize>],
    class_clause_update: &mut [i32]
) {
    let t = params.threshold;
    let outputs = targets.len();
    let clauses = clause_node.len();
    let negative_rate = params.q / (outputs.saturating_sub(1).max(1)) as f32;

    for (clause, node) in clause_node.iter().enumerate() {
        for class_id in 0..outputs {
            let idx = class_id * clauses + clause;
            let clipped = class_sum[class_id].clamp(-t, t);
            let y = targets[class_id];
            let target = if clipped > y { -1 } else { 1 };

            if target == -1 && rng.random::<f32>() >= negative_rate {
                class_clause_update[idx] = 0;
                continue;
            }

            let sign = if weights[idx] >= 0 { 1 } else { -1 };
            let error = (y - clipped).unsigned_abs() as f32;
            if rng.random::<f32>() < error / (2 * t) as f32 {
                let update = target * sign;
                class_clause_update[idx] = update;
                if node.is_some() {
                    weights[idx] = if update > 0 {
                        weights[idx].saturating_add(sign)
                    } else {
                        weights[idx].saturating_sub(sign)
                    };
                }
            } else {
                class_clause_update[idx] = 0;
            }
        }
    }
}

/// # Overview
///
/// Applies one feedback decision to the automata of a single clause.
///
/// `x` is the literal row of the representative node (surface literals or
/// encoded messages, `bank.chunks()` words). Type I draws one `1/s` mask
/// per chunk:
///
/// - clause active and under the include cap: strengthen present literals
///   (all, or those outside the mask without boost), weaken absent
///   literals inside the mask;
/// - otherwise: weaken every literal inside the mask.
///
/// Type II raises excluded literals that are absent at the node.
#[allow(clippy::too_many_arguments)]
pub fn update_clause<R: Rng>(
    rng: &mut R,
    params: &FeedbackParams,
    bank: &mut StateBank,
    clause: usize,
    update: i32,
    x: Option<&[u32]>,
    include_count: usize,
    feedback_threshold: u32
) {
    let chunks = bank.chunks();
    if update > 0 {
        let strengthen = x.filter(|_| include_count <= params.max_included_literals);
        for chunk in 0..chunks {
            let feedback = random_mask(rng, feedback_threshold);
            match strengthen {
                Some(row) => {
                    let present = row[chunk];
                    let include = if params.boost {
                        present
                    } else {
                        present & !feedback
                    };
                    bank.increment_masked(clause, chunk, include);
                    bank.decrement_masked(clause, chunk, !present & feedback);
                }
                None => bank.decrement_masked(clause, chunk, feedback)
            }
        }
    } else if let (true, Some(row)) = (update < 0, x) {
        for chunk in 0..chunks {
            let excluded = !bank.action_chunk(clause, chunk);
            bank.increment_masked(clause, chunk, !row[chunk] & excluded);
        }
    }
}

/// # Overview
///
/// Runs [`update_clause`] for every (clause, output) pair of one layer.
///
/// `x` holds one row of `bank.chunks()` words per node of the graph;
/// `s` is the layer's specificity.
#[allow(clippy::too_many_arguments)]
pub fn update_bank<R: Rng>(
    rng: &mut R,
    params: &FeedbackParams,
    bank: &mut StateBank,
    s: f32,
    x: &[u32],
    clause_node: &[Option<usize>],
    include_counts: &[usize],
    class_clause_update: &[i32]
) {
    let chunks = bank.chunks();
    let clauses = bank.clauses();
    let outputs = class_clause_update.len() / clauses;
    let feedback_threshold = prob_to_threshold(1.0 / s);

    for clause in 0..clauses {
        let row = clause_node[clause].map(|node| &x[node * chunks..(node + 1) * chunks]);
        for class_id in 0..outputs {
            update_clause(
                rng,
                params,
                bank,
                clause,
                class_clause_update[class_id * clauses + clause],
                row,
                include_counts[clause],
                feedback_threshold
            );
        }
    }
}
