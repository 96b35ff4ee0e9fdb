//! Contiguous dataset storage.
//!
//! The epoch loop operates on slices to avoid per-sample allocations. `Dataset`
//! keeps inputs and targets in validated, row-major buffers. Parsing,
//! normalization and label encoding happen before data reaches this type.

use crate::{Error, Result};

/// A supervised dataset: inputs (X) and targets (Y).
///
/// Stored as contiguous buffers with row-major layout:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
///
/// An empty dataset is valid as long as its dimensions are known.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Vec<f32>,
    targets: Vec<f32>,
    input_dim: usize,
    target_dim: usize,
    len: usize,
}

impl Dataset {
    /// An empty dataset with fixed per-sample dimensions.
    pub fn empty(input_dim: usize, target_dim: usize) -> Result<Self> {
        Self::from_flat(Vec::new(), Vec::new(), input_dim, target_dim)
    }

    /// Build a dataset from flat buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`.
    pub fn from_flat(
        inputs: Vec<f32>,
        targets: Vec<f32>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }
        if target_dim == 0 {
            return Err(Error::InvalidData("target_dim must be > 0".to_owned()));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {}",
                inputs.len(),
                input_dim
            )));
        }

        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match len * target_dim ({} * {})",
                targets.len(),
                len,
                target_dim
            )));
        }

        Ok(Self {
            inputs,
            targets,
            input_dim,
            target_dim,
            len,
        })
    }

    /// Build a dataset from per-sample rows.
    ///
    /// Dimensions are taken from the first row, so `inputs` must not be empty;
    /// use [`Dataset::empty`] for that case.
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }
        let (Some(first_x), Some(first_y)) = (inputs.first(), targets.first()) else {
            return Err(Error::InvalidData("inputs must not be empty".to_owned()));
        };

        let mut data = Self::empty(first_x.len(), first_y.len())?;
        data.inputs.reserve(inputs.len() * data.input_dim);
        data.targets.reserve(targets.len() * data.target_dim);
        for (x, y) in inputs.iter().zip(targets) {
            data.push(x, y)?;
        }
        Ok(data)
    }

    /// Append one sample.
    pub fn push(&mut self, input: &[f32], target: &[f32]) -> Result<()> {
        if input.len() != self.input_dim {
            return Err(Error::InvalidData(format!(
                "input row {} has len {}, expected {}",
                self.len,
                input.len(),
                self.input_dim
            )));
        }
        if target.len() != self.target_dim {
            return Err(Error::InvalidData(format!(
                "target row {} has len {}, expected {}",
                self.len,
                target.len(),
                self.target_dim
            )));
        }
        self.inputs.extend_from_slice(input);
        self.targets.extend_from_slice(target);
        self.len += 1;
        Ok(())
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    #[inline]
    /// Returns the `idx`-th input row (shape: `(input_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    #[inline]
    /// Returns the `idx`-th target row (shape: `(target_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn target(&self, idx: usize) -> &[f32] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }

    /// Iterate `(input, target)` pairs in storage order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&[f32], &[f32])> + '_ {
        self.inputs
            .chunks_exact(self.input_dim)
            .zip(self.targets.chunks_exact(self.target_dim))
    }
}
