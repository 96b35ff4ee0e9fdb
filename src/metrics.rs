//! Metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop).
//! Each helper reuses one set of activation buffers for the whole dataset.

use crate::epoch::check_dataset;
use crate::forward::{Activations, forward_into};
use crate::{ActivationKind, Dataset, Error, Result, WeightSet};

/// Summary of a model on a labelled dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Mean over samples of `mean_k((t_k - y_k)^2)`.
    pub mean_error: f32,
    /// Fraction of samples whose output argmax equals the target argmax.
    pub accuracy: f32,
    pub samples: usize,
}

/// Index of the largest value; the first one wins ties and NaN is skipped.
/// `None` if nothing is comparable.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Predicted class of one input: the index of the strongest output unit.
pub fn classify(input: &[f32], weights: &WeightSet, kind: ActivationKind) -> Result<usize> {
    let mut acts = Activations::new(weights.topology());
    forward_into(input, weights, kind, &mut acts)?;
    argmax(acts.output())
        .ok_or_else(|| Error::NonFiniteValue("output has no comparable value".to_owned()))
}

/// Predicted class of every input in `data`, in order.
pub fn predict_classes(data: &Dataset, weights: &WeightSet, kind: ActivationKind) -> Result<Vec<usize>> {
    check_dataset(data, weights.topology())?;
    let mut acts = Activations::new(weights.topology());
    let mut out = Vec::with_capacity(data.len());
    for (idx, (input, _)) in data.iter().enumerate() {
        forward_into(input, weights, kind, &mut acts)?;
        let class = argmax(acts.output()).ok_or_else(|| {
            Error::NonFiniteValue(format!("sample {idx}: output has no comparable value"))
        })?;
        out.push(class);
    }
    Ok(out)
}

/// Mean error and argmax accuracy over `data`. Weights are not modified.
///
/// An empty dataset reports zero error and zero accuracy.
pub fn evaluate(data: &Dataset, weights: &WeightSet, kind: ActivationKind) -> Result<EvalReport> {
    check_dataset(data, weights.topology())?;
    if data.is_empty() {
        return Ok(EvalReport {
            mean_error: 0.0,
            accuracy: 0.0,
            samples: 0,
        });
    }

    let mut acts = Activations::new(weights.topology());
    let mut total = 0.0_f32;
    let mut correct = 0usize;
    for (input, target) in data.iter() {
        forward_into(input, weights, kind, &mut acts)?;
        let output = acts.output();

        let sum_sq: f32 = output
            .iter()
            .zip(target)
            .map(|(y, t)| (t - y) * (t - y))
            .sum();
        total += sum_sq / output.len() as f32;

        let predicted = argmax(output);
        if predicted.is_some() && predicted == argmax(target) {
            correct += 1;
        }
    }

    let n = data.len() as f32;
    Ok(EvalReport {
        mean_error: total / n,
        accuracy: correct as f32 / n,
        samples: data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Topology;

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[-3.0]), Some(0));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN, f32::NAN]), None);
    }

    fn identity_like() -> WeightSet {
        // 2 -> 2 -> 2 linear network that copies its input.
        let topology = Topology::new(2, 2, 2).unwrap();
        WeightSet::from_parts(
            topology,
            vec![1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0],
            vec![1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn classify_uses_output_argmax() {
        let ws = identity_like();
        assert_eq!(classify(&[0.9, 0.1], &ws, ActivationKind::Linear).unwrap(), 0);
        assert_eq!(classify(&[0.2, 0.4], &ws, ActivationKind::Linear).unwrap(), 1);
        assert!(classify(&[0.2], &ws, ActivationKind::Linear).is_err());
    }

    #[test]
    fn evaluate_reports_error_and_accuracy() {
        let ws = identity_like();
        let data = Dataset::from_rows(
            &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.4]],
            &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]],
        )
        .unwrap();

        let report = evaluate(&data, &ws, ActivationKind::Linear).unwrap();
        assert_eq!(report.samples, 3);
        assert!((report.accuracy - 2.0 / 3.0).abs() < 1e-6);
        // Only the third sample is off: ((0.6)^2 + (0.6)^2) / 2 = 0.36
        assert!((report.mean_error - 0.36 / 3.0).abs() < 1e-6);

        let classes = predict_classes(&data, &ws, ActivationKind::Linear).unwrap();
        assert_eq!(classes, vec![0, 1, 0]);
    }

    #[test]
    fn evaluate_empty_dataset() {
        let ws = identity_like();
        let report = evaluate(&Dataset::empty(2, 2).unwrap(), &ws, ActivationKind::Linear).unwrap();
        assert_eq!(report.samples, 0);
        assert_eq!(report.mean_error, 0.0);
    }
}
