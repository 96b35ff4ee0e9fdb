//! Forward propagation through the hidden and output layer.

use crate::{ActivationKind, Error, Result, Topology, WeightSet};

/// Post-activation outputs of both layers for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Activations {
    hidden: Vec<f32>,
    output: Vec<f32>,
}

impl Activations {
    /// Zeroed buffers sized for `topology`.
    pub fn new(topology: Topology) -> Self {
        Self {
            hidden: vec![0.0; topology.n_hidden],
            output: vec![0.0; topology.n_out],
        }
    }

    #[inline]
    pub fn hidden(&self) -> &[f32] {
        &self.hidden
    }

    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    #[inline]
    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>) {
        (self.hidden, self.output)
    }

    #[inline]
    fn fits(&self, topology: Topology) -> bool {
        self.hidden.len() == topology.n_hidden && self.output.len() == topology.n_out
    }
}

/// Forward pass for a single sample.
///
/// Allocates fresh buffers; the epoch loop uses [`forward_into`] instead.
pub fn forward(input: &[f32], weights: &WeightSet, kind: ActivationKind) -> Result<Activations> {
    let mut out = Activations::new(weights.topology());
    forward_into(input, weights, kind, &mut out)?;
    Ok(out)
}

/// Forward pass for a single sample, writing into `out`.
///
/// Computes:
/// - `hidden[j] = act(sum_i input[i] * W1[j][i] + B1[j])`
/// - `output[k] = act(sum_j hidden[j] * W2[k][j] + B2[k])`
///
/// `out` is reshaped if it was built for a different topology.
pub fn forward_into(
    input: &[f32],
    weights: &WeightSet,
    kind: ActivationKind,
    out: &mut Activations,
) -> Result<()> {
    let topology = weights.topology();
    if input.len() != topology.n_in {
        return Err(Error::DimensionMismatch {
            what: "input",
            expected: topology.n_in,
            actual: input.len(),
        });
    }
    if !out.fits(topology) {
        *out = Activations::new(topology);
    }

    dense(input, weights.w1(), weights.b1(), kind, &mut out.hidden);
    dense(&out.hidden, weights.w2(), weights.b2(), kind, &mut out.output);
    Ok(())
}

#[inline]
fn dense(inputs: &[f32], weights: &[f32], biases: &[f32], kind: ActivationKind, outputs: &mut [f32]) {
    let in_dim = inputs.len();
    debug_assert_eq!(weights.len(), in_dim * outputs.len());
    debug_assert_eq!(biases.len(), outputs.len());

    for (o, (out, row)) in outputs
        .iter_mut()
        .zip(weights.chunks_exact(in_dim))
        .enumerate()
    {
        let mut sum = biases[o];
        for (w, x) in row.iter().zip(inputs) {
            sum = w.mul_add(*x, sum);
        }
        *out = kind.activate(sum);
    }
}
