//! Network topology and the weight set of one training run.
//!
//! Weights are row-major matrices stored in contiguous buffers:
//! - `w1` has shape `(n_hidden, n_in)`
//! - `w2` has shape `(n_out, n_hidden)`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Layer sizes of a single-hidden-layer network.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topology {
    pub n_in: usize,
    pub n_hidden: usize,
    pub n_out: usize,
}

impl Topology {
    pub fn new(n_in: usize, n_hidden: usize, n_out: usize) -> Result<Self> {
        let topology = Self {
            n_in,
            n_hidden,
            n_out,
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Topology with `n_hidden = max(1, (n_in + n_out) / 2)`.
    pub fn with_default_hidden(n_in: usize, n_out: usize) -> Result<Self> {
        Self::new(n_in, ((n_in + n_out) / 2).max(1), n_out)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_in == 0 || self.n_hidden == 0 || self.n_out == 0 {
            return Err(Error::InvalidTopology(format!(
                "all dimensions must be > 0, got n_in={} n_hidden={} n_out={}",
                self.n_in, self.n_hidden, self.n_out
            )));
        }
        Ok(())
    }
}

/// Weights and biases of the input->hidden and hidden->output layers.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSet {
    topology: Topology,
    w1: Vec<f32>,
    b1: Vec<f32>,
    w2: Vec<f32>,
    b2: Vec<f32>,
}

impl WeightSet {
    /// Draw every weight and bias uniformly from `[-1, 1]`.
    ///
    /// Values are drawn in the order `w1` (row-major), `b1`, `w2`, `b2`, so a
    /// seeded RNG always reproduces the same set.
    pub fn init<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Result<Self> {
        topology.validate()?;
        let Topology {
            n_in,
            n_hidden,
            n_out,
        } = topology;

        let mut draw = |len: usize| -> Vec<f32> {
            (0..len).map(|_| rng.gen_range(-1.0_f32..=1.0)).collect()
        };
        let w1 = draw(n_hidden * n_in);
        let b1 = draw(n_hidden);
        let w2 = draw(n_out * n_hidden);
        let b2 = draw(n_out);

        Ok(Self {
            topology,
            w1,
            b1,
            w2,
            b2,
        })
    }

    pub fn init_with_seed(topology: Topology, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::init(topology, &mut rng)
    }

    /// Build a weight set from explicit row-major buffers.
    pub fn from_parts(
        topology: Topology,
        w1: Vec<f32>,
        b1: Vec<f32>,
        w2: Vec<f32>,
        b2: Vec<f32>,
    ) -> Result<Self> {
        topology.validate()?;
        let Topology {
            n_in,
            n_hidden,
            n_out,
        } = topology;

        check_len("w1", n_hidden * n_in, w1.len())?;
        check_len("b1", n_hidden, b1.len())?;
        check_len("w2", n_out * n_hidden, w2.len())?;
        check_len("b2", n_out, b2.len())?;

        for (name, buf) in [("w1", &w1), ("b1", &b1), ("w2", &w2), ("b2", &b2)] {
            if let Some(idx) = buf.iter().position(|v| !v.is_finite()) {
                return Err(Error::NonFiniteValue(format!(
                    "{name}[{idx}] = {}",
                    buf[idx]
                )));
            }
        }

        Ok(Self {
            topology,
            w1,
            b1,
            w2,
            b2,
        })
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Input->hidden weights, row-major `(n_hidden, n_in)`.
    #[inline]
    pub fn w1(&self) -> &[f32] {
        &self.w1
    }

    #[inline]
    pub fn b1(&self) -> &[f32] {
        &self.b1
    }

    /// Hidden->output weights, row-major `(n_out, n_hidden)`.
    #[inline]
    pub fn w2(&self) -> &[f32] {
        &self.w2
    }

    #[inline]
    pub fn b2(&self) -> &[f32] {
        &self.b2
    }

    /// `W1[j][i]`: weight from input `i` to hidden unit `j`.
    #[inline]
    pub fn w1_at(&self, j: usize, i: usize) -> f32 {
        self.w1[j * self.topology.n_in + i]
    }

    /// `W2[k][j]`: weight from hidden unit `j` to output `k`.
    #[inline]
    pub fn w2_at(&self, k: usize, j: usize) -> f32 {
        self.w2[k * self.topology.n_hidden + j]
    }

    /// Mutable views of all four buffers at once: `(w1, b1, w2, b2)`.
    #[inline]
    pub(crate) fn parts_mut(&mut self) -> (&mut [f32], &mut [f32], &mut [f32], &mut [f32]) {
        (&mut self.w1, &mut self.b1, &mut self.w2, &mut self.b2)
    }

    /// Total number of trainable scalars.
    pub fn num_params(&self) -> usize {
        self.w1.len() + self.b1.len() + self.w2.len() + self.b2.len()
    }

    pub fn is_finite(&self) -> bool {
        self.w1
            .iter()
            .chain(&self.b1)
            .chain(&self.w2)
            .chain(&self.b2)
            .all(|v| v.is_finite())
    }
}

#[inline]
fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
