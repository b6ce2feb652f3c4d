//! Parallel inference across examples using rayon.
//!
//! Training stays sequential: every example must see the updates of the
//! previous one. Inference only reads the model, so graphs are evaluated
//! concurrently with one workspace per rayon worker.

use rayon::prelude::*;

use crate::{
    GraphSet, GraphTsetlinMachine, Result, Transformed,
    codec::LabelCodec,
    evaluate::clause_counts,
    machine::Workspace
};

/// Runs the forward pass of every graph in parallel and maps the
/// resulting workspace with `readout`.
fn forward_all<C, R, F>(tm: &GraphTsetlinMachine<C>, graphs: &GraphSet, readout: F) -> Result<Vec<R>>
where
    C: LabelCodec,
    R: Send,
    F: Fn(&Workspace, usize) -> R + Sync + Send
{
    let model = tm.model()?;
    model.check(graphs)?;
    let config = tm.config();
    let hypervectors = tm.hypervectors();

    Ok((0..graphs.number_of_graphs())
        .into_par_iter()
        .map_init(
            || Workspace::new(config, model.outputs, graphs),
            |ws, e| {
                let graph = graphs.graph(e);
                model.forward(hypervectors, graph, ws);
                readout(ws, graph.nodes)
            }
        )
        .collect())
}

/// # Overview
///
/// Parallel [`score`](GraphTsetlinMachine::score).
pub fn score<C: LabelCodec>(tm: &GraphTsetlinMachine<C>, graphs: &GraphSet) -> Result<Vec<Vec<i32>>> {
    forward_all(tm, graphs, |ws, _| ws.class_sum.clone())
}

/// # Overview
///
/// Parallel [`predict`](GraphTsetlinMachine::predict).
pub fn predict<C>(tm: &GraphTsetlinMachine<C>, graphs: &GraphSet) -> Result<Vec<C::Prediction>>
where
    C: LabelCodec,
    C::Prediction: Send
{
    forward_all(tm, graphs, |ws, _| C::decode(&ws.class_sum))
}

/// # Overview
///
/// Parallel accuracy over a labelled graph set.
pub fn evaluate<C>(tm: &GraphTsetlinMachine<C>, graphs: &GraphSet, labels: &[C::Label]) -> Result<f32>
where
    C: LabelCodec,
    C::Prediction: Send + Sync,
    C::Label: Sync
{
    if labels.len() != graphs.number_of_graphs() {
        return Err(crate::Error::DimensionMismatch {
            what:     "labels",
            expected: graphs.number_of_graphs(),
            got:      labels.len()
        });
    }
    let predictions = predict(tm, graphs)?;
    let correct = predictions
        .par_iter()
        .zip(labels.par_iter())
        .filter(|(p, y)| C::is_correct(p, y))
        .count();
    Ok(correct as f32 / labels.len() as f32)
}

/// # Overview
///
/// Parallel [`transform`](GraphTsetlinMachine::transform).
pub fn transform<C: LabelCodec>(tm: &GraphTsetlinMachine<C>, graphs: &GraphSet) -> Result<Transformed> {
    let rows = forward_all(tm, graphs, |ws, nodes| {
        (clause_counts(&ws.current, nodes), ws.class_sum.clone())
    })?;
    let (clause_outputs, class_sums) = rows.into_iter().unzip();
    Ok(Transformed {
        clause_outputs,
        class_sums
    })
}
