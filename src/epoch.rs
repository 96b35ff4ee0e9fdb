//! One pass of online training over a dataset.

use crate::backprop::{Scratch, backprop_step};
use crate::{ActivationKind, Dataset, Error, Result, Topology, WeightSet};

/// Check that every sample of `data` fits `topology`.
pub fn check_dataset(data: &Dataset, topology: Topology) -> Result<()> {
    if data.input_dim() != topology.n_in {
        return Err(Error::DimensionMismatch {
            what: "dataset input_dim",
            expected: topology.n_in,
            actual: data.input_dim(),
        });
    }
    if data.target_dim() != topology.n_out {
        return Err(Error::DimensionMismatch {
            what: "dataset target_dim",
            expected: topology.n_out,
            actual: data.target_dim(),
        });
    }
    Ok(())
}

/// One pass of online gradient descent over `data`, in storage order.
///
/// Returns the mean of the per-sample squared errors, or `0.0` for an empty
/// dataset. Shapes are checked once up front; no sample is skipped.
pub fn run_epoch(
    data: &Dataset,
    weights: &mut WeightSet,
    learning_rate: f32,
    kind: ActivationKind,
    scratch: &mut Scratch,
) -> Result<f32> {
    check_dataset(data, weights.topology())?;
    if data.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0_f32;
    for (idx, (input, target)) in data.iter().enumerate() {
        scratch.forward(input, weights, kind)?;
        let mse = backprop_step(input, target, scratch, weights, learning_rate, kind)
            .map_err(|e| e.non_finite_at(format!("sample {idx}")))?;
        total += mse;
    }

    Ok(total / data.len() as f32)
}
