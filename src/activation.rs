//! Activation functions.
//!
//! Both layers compute a pre-activation value `z = W x + b` and then apply the
//! run's activation element-wise: `y = activation(z)`.
//!
//! Only the *post-activation* outputs `y` are kept. During backprop the
//! derivative `dy/dz` is recovered from `y` itself, so no separate `z` buffer is
//! needed.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Element-wise activation shared by the hidden and output layer of a run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActivationKind {
    Linear,
    #[default]
    Logistic,
    Tanh,
}

impl ActivationKind {
    #[inline]
    pub fn activate(self, x: f32) -> f32 {
        match self {
            ActivationKind::Linear => x,
            ActivationKind::Logistic => logistic(x),
            ActivationKind::Tanh => x.tanh(),
        }
    }

    /// Derivative of the activation with respect to its input, expressed in terms
    /// of the activated output `a`.
    #[inline]
    pub fn derivative_from_output(self, a: f32) -> f32 {
        match self {
            ActivationKind::Linear => 1.0,
            ActivationKind::Logistic => a * (1.0 - a),
            ActivationKind::Tanh => 1.0 - a * a,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActivationKind::Linear => "linear",
            ActivationKind::Logistic => "logistic",
            ActivationKind::Tanh => "tanh",
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "identity" => Ok(ActivationKind::Linear),
            "logistic" | "sigmoid" => Ok(ActivationKind::Logistic),
            "tanh" | "hyperbolic" => Ok(ActivationKind::Tanh),
            other => Err(Error::InvalidConfig(format!(
                "unknown activation {other:?}; expected linear, logistic or tanh"
            ))),
        }
    }
}

#[inline]
fn logistic(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity_with_unit_slope() {
        assert_eq!(ActivationKind::Linear.activate(-3.5), -3.5);
        assert_eq!(ActivationKind::Linear.activate(2.0), 2.0);
        assert_eq!(ActivationKind::Linear.derivative_from_output(123.0), 1.0);
    }

    #[test]
    fn logistic_basic_values() {
        let y0 = ActivationKind::Logistic.activate(0.0);
        assert!((y0 - 0.5).abs() < 1e-6);

        let y_pos = ActivationKind::Logistic.activate(10.0);
        let y_neg = ActivationKind::Logistic.activate(-10.0);
        assert!(y_pos > 0.999);
        assert!(y_neg < 0.001);
    }

    #[test]
    fn logistic_does_not_overflow_for_large_inputs() {
        for x in [-1e4_f32, -800.0, 800.0, 1e4, f32::MAX, f32::MIN] {
            let y = ActivationKind::Logistic.activate(x);
            assert!(y.is_finite(), "logistic({x}) = {y}");
            assert!((0.0..=1.0).contains(&y));
        }
    }

    #[test]
    fn tanh_and_logistic_gradients_from_output() {
        let y_tanh = ActivationKind::Tanh.activate(0.3);
        let g_tanh = ActivationKind::Tanh.derivative_from_output(y_tanh);
        assert!((g_tanh - (1.0 - y_tanh * y_tanh)).abs() < 1e-6);

        let y_sig = ActivationKind::Logistic.activate(0.0);
        let g_sig = ActivationKind::Logistic.derivative_from_output(y_sig);
        assert!((g_sig - 0.25).abs() < 1e-6);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let eps = 1e-3_f32;
        for kind in [
            ActivationKind::Linear,
            ActivationKind::Logistic,
            ActivationKind::Tanh,
        ] {
            for x in [-1.5_f32, -0.2, 0.0, 0.7, 2.0] {
                let numeric = (kind.activate(x + eps) - kind.activate(x - eps)) / (2.0 * eps);
                let analytic = kind.derivative_from_output(kind.activate(x));
                assert!(
                    (numeric - analytic).abs() < 1e-3,
                    "{kind} at {x}: numeric={numeric} analytic={analytic}"
                );
            }
        }
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("linear".parse::<ActivationKind>().unwrap(), ActivationKind::Linear);
        assert_eq!("Sigmoid".parse::<ActivationKind>().unwrap(), ActivationKind::Logistic);
        assert_eq!(" hyperbolic ".parse::<ActivationKind>().unwrap(), ActivationKind::Tanh);
        assert!("relu".parse::<ActivationKind>().is_err());
        assert_eq!(ActivationKind::Tanh.to_string(), "tanh");
    }
}
