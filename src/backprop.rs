//! Online backpropagation: one sample, one in-place weight update.

use crate::forward::forward_into;
use crate::{Activations, ActivationKind, Error, Result, Topology, WeightSet};

/// Reusable per-sample buffers: forward activations plus layer deltas.
///
/// Allocate once per run via [`Scratch::new`] and reuse for every sample.
#[derive(Debug, Clone)]
pub struct Scratch {
    pub activations: Activations,
    output_delta: Vec<f32>,
    hidden_delta: Vec<f32>,
}

impl Scratch {
    pub fn new(topology: Topology) -> Self {
        Self {
            activations: Activations::new(topology),
            output_delta: vec![0.0; topology.n_out],
            hidden_delta: vec![0.0; topology.n_hidden],
        }
    }

    /// Forward pass for `input`, leaving the activations in this scratch.
    #[inline]
    pub fn forward(&mut self, input: &[f32], weights: &WeightSet, kind: ActivationKind) -> Result<()> {
        forward_into(input, weights, kind, &mut self.activations)
    }

    #[inline]
    pub fn output_delta(&self) -> &[f32] {
        &self.output_delta
    }

    #[inline]
    pub fn hidden_delta(&self) -> &[f32] {
        &self.hidden_delta
    }

    fn fits(&self, topology: Topology) -> bool {
        self.activations.hidden().len() == topology.n_hidden
            && self.activations.output().len() == topology.n_out
            && self.output_delta.len() == topology.n_out
            && self.hidden_delta.len() == topology.n_hidden
    }
}

/// Apply one gradient-descent update for a single sample and return its mse.
///
/// `scratch.activations` must hold the forward pass of this same `input` against
/// the current `weights` (see [`Scratch::forward`]).
///
/// With `e = target - output`:
/// - `output_delta[k] = e[k] * act'(output[k])`
/// - `hidden_delta[j] = act'(hidden[j]) * sum_k output_delta[k] * W2[k][j]`
///   using `W2` *before* it is updated
/// - `W2[k][j] += lr * output_delta[k] * hidden[j]`, `B2[k] += lr * output_delta[k]`
/// - `W1[j][i] += lr * hidden_delta[j] * input[i]`, `B1[j] += lr * hidden_delta[j]`
///
/// Returns `mean_k(e[k]^2)`.
///
/// Shape errors and non-finite activations are reported before anything is
/// mutated. An update that overflows is reported with [`Error::NonFiniteValue`]
/// after it has been applied; the weights must not be used further.
pub fn backprop_step(
    input: &[f32],
    target: &[f32],
    scratch: &mut Scratch,
    weights: &mut WeightSet,
    learning_rate: f32,
    kind: ActivationKind,
) -> Result<f32> {
    let topology = weights.topology();
    if input.len() != topology.n_in {
        return Err(Error::DimensionMismatch {
            what: "input",
            expected: topology.n_in,
            actual: input.len(),
        });
    }
    if target.len() != topology.n_out {
        return Err(Error::DimensionMismatch {
            what: "target",
            expected: topology.n_out,
            actual: target.len(),
        });
    }
    if !scratch.fits(topology) {
        return Err(Error::DimensionMismatch {
            what: "scratch activations",
            expected: topology.n_hidden + topology.n_out,
            actual: scratch.activations.hidden().len() + scratch.activations.output().len(),
        });
    }

    let hidden = scratch.activations.hidden();
    let output = scratch.activations.output();
    if let Some(k) = output.iter().position(|v| !v.is_finite()) {
        return Err(Error::NonFiniteValue(format!("output[{k}] = {}", output[k])));
    }
    if let Some(j) = hidden.iter().position(|v| !v.is_finite()) {
        return Err(Error::NonFiniteValue(format!("hidden[{j}] = {}", hidden[j])));
    }

    let n_hidden = topology.n_hidden;
    let n_in = topology.n_in;

    let mut sum_sq = 0.0_f32;
    for k in 0..topology.n_out {
        let err = target[k] - output[k];
        sum_sq = err.mul_add(err, sum_sq);
        scratch.output_delta[k] = err * kind.derivative_from_output(output[k]);
    }

    // Hidden deltas read W2 before the output layer is touched.
    for j in 0..n_hidden {
        let mut back = 0.0_f32;
        for (k, d) in scratch.output_delta.iter().enumerate() {
            back = weights.w2_at(k, j).mul_add(*d, back);
        }
        scratch.hidden_delta[j] = back * kind.derivative_from_output(hidden[j]);
    }

    let (w1, b1, w2, b2) = weights.parts_mut();

    for (k, d) in scratch.output_delta.iter().enumerate() {
        let step = learning_rate * d;
        let row = &mut w2[k * n_hidden..(k + 1) * n_hidden];
        for (w, h) in row.iter_mut().zip(hidden) {
            *w = step.mul_add(*h, *w);
        }
        b2[k] += step;
    }

    for (j, d) in scratch.hidden_delta.iter().enumerate() {
        let step = learning_rate * d;
        let row = &mut w1[j * n_in..(j + 1) * n_in];
        for (w, x) in row.iter_mut().zip(input) {
            *w = step.mul_add(*x, *w);
        }
        b1[j] += step;
    }

    for (name, buf) in [("w2", &*w2), ("b2", &*b2), ("w1", &*w1), ("b1", &*b1)] {
        if let Some(idx) = buf.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteValue(format!(
                "update overflowed: {name}[{idx}] = {}",
                buf[idx]
            )));
        }
    }

    Ok(sum_sq / topology.n_out as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::forward;

    /// `0.5 * sum_k (t_k - y_k)^2`, the loss whose negative gradient the update follows.
    fn half_sse(ws: &WeightSet, input: &[f32], target: &[f32], kind: ActivationKind) -> f32 {
        let acts = forward(input, ws, kind).unwrap();
        acts.output()
            .iter()
            .zip(target)
            .map(|(y, t)| 0.5 * (t - y) * (t - y))
            .sum()
    }

    fn assert_close(analytic: f32, numeric: f32, abs_tol: f32, rel_tol: f32) {
        let diff = (analytic - numeric).abs();
        let scale = analytic.abs().max(numeric.abs()).max(1.0);
        assert!(
            diff <= abs_tol || diff / scale <= rel_tol,
            "analytic={analytic} numeric={numeric} diff={diff}"
        );
    }

    fn perturbed(ws: &WeightSet, which: usize, idx: usize, delta: f32) -> WeightSet {
        let mut w = ws.clone();
        let (w1, b1, w2, b2) = w.parts_mut();
        let buf = match which {
            0 => w1,
            1 => b1,
            2 => w2,
            _ => b2,
        };
        buf[idx] += delta;
        w
    }

    fn buffer(ws: &WeightSet, which: usize) -> &[f32] {
        match which {
            0 => ws.w1(),
            1 => ws.b1(),
            2 => ws.w2(),
            _ => ws.b2(),
        }
    }

    #[test]
    fn update_matches_numeric_gradients() {
        let topology = Topology::new(3, 4, 2).unwrap();
        let input = [0.3_f32, -0.7, 0.2];
        let target = [0.9_f32, 0.1];

        for kind in [ActivationKind::Logistic, ActivationKind::Tanh, ActivationKind::Linear] {
            let before = WeightSet::init_with_seed(topology, 0).unwrap();
            let mut after = before.clone();
            let mut scratch = Scratch::new(topology);
            scratch.forward(&input, &after, kind).unwrap();

            let lr = 1.0_f32;
            backprop_step(&input, &target, &mut scratch, &mut after, lr, kind).unwrap();

            let eps = 1e-3_f32;
            for which in 0..4 {
                for idx in 0..buffer(&before, which).len() {
                    let plus = half_sse(&perturbed(&before, which, idx, eps), &input, &target, kind);
                    let minus = half_sse(&perturbed(&before, which, idx, -eps), &input, &target, kind);
                    let numeric = -(plus - minus) / (2.0 * eps);
                    let analytic = (buffer(&after, which)[idx] - buffer(&before, which)[idx]) / lr;
                    assert_close(analytic, numeric, 1e-3, 1e-2);
                }
            }
        }
    }

    #[test]
    fn returns_mean_squared_error_of_pre_update_output() {
        let topology = Topology::new(2, 2, 2).unwrap();
        let mut ws = WeightSet::init_with_seed(topology, 3).unwrap();
        let input = [1.0_f32, 0.0];
        let target = [1.0_f32, 0.0];

        let mut scratch = Scratch::new(topology);
        scratch.forward(&input, &ws, ActivationKind::Logistic).unwrap();
        let y = scratch.activations.output().to_vec();
        let expected = ((1.0 - y[0]).powi(2) + (0.0 - y[1]).powi(2)) / 2.0;

        let mse = backprop_step(&input, &target, &mut scratch, &mut ws, 0.5, ActivationKind::Logistic)
            .unwrap();
        assert!((mse - expected).abs() < 1e-6);
    }

    #[test]
    fn hidden_deltas_use_pre_update_output_weights() {
        // 1 -> 1 -> 1, linear: every quantity can be followed by hand.
        let topology = Topology::new(1, 1, 1).unwrap();
        let mut ws = WeightSet::from_parts(topology, vec![0.5], vec![0.0], vec![2.0], vec![0.0]).unwrap();
        let input = [1.0_f32];
        let target = [2.0_f32];

        let mut scratch = Scratch::new(topology);
        scratch.forward(&input, &ws, ActivationKind::Linear).unwrap();
        // hidden = 0.5, output = 1.0, e = 1.0, output_delta = 1.0
        // hidden_delta = 1.0 * W2(=2.0) = 2.0 (pre-update)
        backprop_step(&input, &target, &mut scratch, &mut ws, 0.1, ActivationKind::Linear).unwrap();

        assert!((scratch.output_delta()[0] - 1.0).abs() < 1e-6);
        assert!((scratch.hidden_delta()[0] - 2.0).abs() < 1e-6);
        assert!((ws.w2()[0] - 2.05).abs() < 1e-6);
        assert!((ws.b2()[0] - 0.1).abs() < 1e-6);
        assert!((ws.w1()[0] - 0.7).abs() < 1e-6);
        assert!((ws.b1()[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn dimensions_never_change() {
        let topology = Topology::new(3, 2, 4).unwrap();
        let mut ws = WeightSet::init_with_seed(topology, 11).unwrap();
        let mut scratch = Scratch::new(topology);
        let input = [0.1_f32, 0.2, 0.3];
        let target = [0.0_f32, 1.0, 0.0, 0.0];

        for _ in 0..10 {
            scratch.forward(&input, &ws, ActivationKind::Tanh).unwrap();
            backprop_step(&input, &target, &mut scratch, &mut ws, 0.1, ActivationKind::Tanh).unwrap();
        }
        assert_eq!(ws.topology(), topology);
        assert_eq!(ws.w1().len(), 6);
        assert_eq!(ws.b1().len(), 2);
        assert_eq!(ws.w2().len(), 8);
        assert_eq!(ws.b2().len(), 4);
    }

    #[test]
    fn wrong_target_length_is_dimension_mismatch_and_leaves_weights() {
        let topology = Topology::new(2, 2, 2).unwrap();
        let mut ws = WeightSet::init_with_seed(topology, 5).unwrap();
        let before = ws.clone();
        let mut scratch = Scratch::new(topology);
        scratch.forward(&[0.0, 1.0], &ws, ActivationKind::Logistic).unwrap();

        let err = backprop_step(&[0.0, 1.0], &[1.0], &mut scratch, &mut ws, 0.5, ActivationKind::Logistic)
            .unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                what: "target",
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(ws, before);
    }

    #[test]
    fn non_finite_output_aborts_before_update() {
        let topology = Topology::new(1, 1, 1).unwrap();
        let mut ws =
            WeightSet::from_parts(topology, vec![f32::MAX], vec![0.0], vec![f32::MAX], vec![0.0]).unwrap();
        let before = ws.clone();
        let mut scratch = Scratch::new(topology);
        scratch.forward(&[10.0], &ws, ActivationKind::Linear).unwrap();

        let err = backprop_step(&[10.0], &[0.0], &mut scratch, &mut ws, 0.1, ActivationKind::Linear)
            .unwrap_err();
        assert!(matches!(err, Error::NonFiniteValue(_)));
        assert_eq!(ws, before);
    }

    #[test]
    fn overflowing_update_is_reported() {
        // Finite activations, but lr * delta exceeds f32::MAX.
        let topology = Topology::new(1, 1, 1).unwrap();
        let mut ws = WeightSet::from_parts(topology, vec![0.5], vec![0.0], vec![1.0], vec![0.0]).unwrap();
        let mut scratch = Scratch::new(topology);
        scratch.forward(&[10.0], &ws, ActivationKind::Linear).unwrap();

        let err = backprop_step(&[10.0], &[-10.0], &mut scratch, &mut ws, 1e38, ActivationKind::Linear)
            .unwrap_err();
        match err {
            Error::NonFiniteValue(msg) => assert!(msg.starts_with("update overflowed: w2[0]"), "{msg}"),
            other => panic!("expected NonFiniteValue, got {other:?}"),
        }
    }
}
