//! Label encodings for the three machine flavours.
//!
//! The engine only sees `±T` targets per output. A codec turns user labels
//! into those targets before training and turns raw class sums back into
//! predictions afterwards.

use crate::{Error, Result};

/// # Overview
///
/// Label encoding and decision readout policy.
///
/// Implementors are zero-sized markers selecting how labels map onto
/// outputs. See [`MultiClass`], [`MultiOutput`] and [`SingleOutput`].
pub trait LabelCodec {
    /// Training label of one example.
    type Label;
    /// Decision returned by `predict` for one example.
    type Prediction;

    /// Number of outputs implied by a label set.
    fn outputs(labels: &[Self::Label]) -> Result<usize>;

    /// Writes the `±threshold` target of every output for one label.
    ///
    /// # Errors
    ///
    /// Fails when the label does not fit `targets.len()` outputs.
    fn encode(
        example: usize,
        label: &Self::Label,
        threshold: i32,
        targets: &mut [i32]
    ) -> Result<()>;

    /// Turns raw class sums of one example into a prediction.
    fn decode(class_sum: &[i32]) -> Self::Prediction;

    /// Whether a prediction matches the label.
    fn is_correct(prediction: &Self::Prediction, label: &Self::Label) -> bool;

    /// Encodes a whole label set into a flat `[example][output]` matrix.
    fn encode_all(labels: &[Self::Label], outputs: usize, threshold: i32) -> Result<Vec<i32>> {
        let mut targets = vec![0; labels.len() * outputs];
        let rows = targets.chunks_exact_mut(outputs);
        for (example, (label, row)) in labels.iter().zip(rows).enumerate() {
            Self::encode(example, label, threshold, row)?;
        }
        Ok(targets)
    }
}

#[inline]
fn signed(on: bool, threshold: i32) -> i32 {
    if on { threshold } else { -threshold }
}

/// One class per example; predicts the arg-max output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiClass;

impl LabelCodec for MultiClass {
    type Label = usize;
    type Prediction = usize;

    fn outputs(labels: &[usize]) -> Result<usize> {
        labels
            .iter()
            .max()
            .map(|&max| max + 1)
            .ok_or(Error::EmptyDataset)
    }

    fn encode(example: usize, label: &usize, threshold: i32, targets: &mut [i32]) -> Result<()> {
        if *label >= targets.len() {
            return Err(Error::InvalidLabel {
                example,
                label: *label
            });
        }
        for (class_id, target) in targets.iter_mut().enumerate() {
            *target = signed(class_id == *label, threshold);
        }
        Ok(())
    }

    /// First maximum wins on ties.
    fn decode(class_sum: &[i32]) -> usize {
        let mut best = 0;
        for (class_id, &sum) in class_sum.iter().enumerate() {
            if sum > class_sum[best] {
                best = class_id;
            }
        }
        best
    }

    fn is_correct(prediction: &usize, label: &usize) -> bool {
        prediction == label
    }
}

/// Independent binary outputs; each is on when its sum is non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiOutput;

impl LabelCodec for MultiOutput {
    type Label = Vec<u8>;
    type Prediction = Vec<u8>;

    fn outputs(labels: &[Vec<u8>]) -> Result<usize> {
        let first = labels.first().ok_or(Error::EmptyDataset)?;
        if first.is_empty() {
            return Err(Error::DimensionMismatch {
                what:     "label outputs",
                expected: 1,
                got:      0
            });
        }
        Ok(first.len())
    }

    fn encode(example: usize, label: &Vec<u8>, threshold: i32, targets: &mut [i32]) -> Result<()> {
        if label.len() != targets.len() {
            return Err(Error::DimensionMismatch {
                what:     "label outputs",
                expected: targets.len(),
                got:      label.len()
            });
        }
        for (output, (&bit, target)) in label.iter().zip(targets.iter_mut()).enumerate() {
            if bit > 1 {
                return Err(Error::InvalidLabel {
                    example,
                    label: output
                });
            }
            *target = signed(bit == 1, threshold);
        }
        Ok(())
    }

    fn decode(class_sum: &[i32]) -> Vec<u8> {
        class_sum.iter().map(|&sum| u8::from(sum >= 0)).collect()
    }

    /// Exact match over every output.
    fn is_correct(prediction: &Vec<u8>, label: &Vec<u8>) -> bool {
        prediction == label
    }
}

/// A single binary output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleOutput;

impl LabelCodec for SingleOutput {
    type Label = u8;
    type Prediction = u8;

    fn outputs(labels: &[u8]) -> Result<usize> {
        if labels.is_empty() {
            return Err(Error::EmptyDataset);
        }
        Ok(1)
    }

    fn encode(example: usize, label: &u8, threshold: i32, targets: &mut [i32]) -> Result<()> {
        if *label > 1 {
            return Err(Error::InvalidLabel {
                example,
                label: usize::from(*label)
            });
        }
        targets[0] = signed(*label == 1, threshold);
        Ok(())
    }

    fn decode(class_sum: &[i32]) -> u8 {
        u8::from(class_sum[0] >= 0)
    }

    fn is_correct(prediction: &u8, label: &u8) -> bool {
        prediction == label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiclass_targets() {
        let targets = MultiClass::encode_all(&[2, 0], 3, 15).unwrap();
        assert_eq!(targets, vec![-15, -15, 15, 15, -15, -15]);
        assert_eq!(MultiClass::outputs(&[2, 0, 1]).unwrap(), 3);
    }

    #[test]
    fn multiclass_rejects_unknown_class() {
        let err = MultiClass::encode_all(&[0, 3], 2, 10).unwrap_err();
        assert!(matches!(err, Error::InvalidLabel { example: 1, label: 3 }));
    }

    #[test]
    fn argmax_first_max_wins() {
        assert_eq!(MultiClass::decode(&[3, 7, 7, -1]), 1);
        assert_eq!(MultiClass::decode(&[-2, -2]), 0);
    }

    #[test]
    fn multi_output_roundtrip_signs() {
        let targets = MultiOutput::encode_all(&[vec![1, 0], vec![0, 1]], 2, 5).unwrap();
        assert_eq!(targets, vec![5, -5, -5, 5]);
        assert_eq!(MultiOutput::decode(&[0, -1, 8]), vec![1, 0, 1]);
    }

    #[test]
    fn multi_output_shape_checked() {
        assert!(MultiOutput::encode_all(&[vec![1, 0], vec![1]], 2, 5).is_err());
        assert!(MultiOutput::outputs(&[]).is_err());
    }

    #[test]
    fn single_output() {
        let targets = SingleOutput::encode_all(&[1, 0, 1], 1, 20).unwrap();
        assert_eq!(targets, vec![20, -20, 20]);
        assert_eq!(SingleOutput::decode(&[0]), 1);
        assert_eq!(SingleOutput::decode(&[-1]), 0);
        assert!(SingleOutput::encode_all(&[2], 1, 20).is_err());
    }
}
