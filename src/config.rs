//! Training configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::plateau::{DEFAULT_STD_THRESHOLD, DEFAULT_WINDOW};
use crate::{ActivationKind, Error, Result, Topology};

/// Plateau detection settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateauConfig {
    /// Number of trailing epoch errors inspected.
    pub window: usize,
    /// Population std at or below which the window counts as a plateau.
    pub std_threshold: f32,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            std_threshold: DEFAULT_STD_THRESHOLD,
        }
    }
}

/// Configuration of one training run.
///
/// Example (`serde` feature):
///
/// ```toml
/// learning_rate = 0.5
/// max_epochs = 2000
/// activation = "logistic"
/// target_error = 0.01
/// seed = 7
///
/// [topology]
/// n_in = 2
/// n_hidden = 2
/// n_out = 2
///
/// [plateau]
/// window = 10
/// std_threshold = 1e-5
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub topology: Topology,
    pub learning_rate: f32,
    pub max_epochs: usize,
    pub activation: ActivationKind,
    /// Stop once the epoch error is at or below this value. `0` disables it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub target_error: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub plateau: PlateauConfig,
    /// Seed for weight initialization; `None` draws from OS entropy.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: Option<u64>,
    /// How long the worker waits for a plateau decision; `None` waits forever.
    #[cfg_attr(feature = "serde", serde(default))]
    pub decision_timeout_ms: Option<u64>,
}

impl TrainConfig {
    /// Defaults: `learning_rate = 0.1`, `max_epochs = 100`, logistic activation,
    /// target error disabled, plateau window 10 with threshold `1e-5`.
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            learning_rate: 0.1,
            max_epochs: 100,
            activation: ActivationKind::default(),
            target_error: 0.0,
            plateau: PlateauConfig::default(),
            seed: None,
            decision_timeout_ms: None,
        }
    }

    pub fn learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn activation(mut self, kind: ActivationKind) -> Self {
        self.activation = kind;
        self
    }

    pub fn target_error(mut self, target: f32) -> Self {
        self.target_error = target;
        self
    }

    pub fn plateau(mut self, window: usize, std_threshold: f32) -> Self {
        self.plateau = PlateauConfig {
            window,
            std_threshold,
        };
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn decision_timeout_duration(&self) -> Option<Duration> {
        self.decision_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if self.max_epochs == 0 {
            return Err(Error::InvalidConfig("max_epochs must be > 0".to_owned()));
        }
        if !(self.target_error.is_finite() && self.target_error >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "target_error must be finite and >= 0, got {}",
                self.target_error
            )));
        }
        if self.plateau.window == 0 {
            return Err(Error::InvalidConfig(
                "plateau window must be > 0".to_owned(),
            ));
        }
        if !(self.plateau.std_threshold.is_finite() && self.plateau.std_threshold >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "plateau std_threshold must be finite and >= 0, got {}",
                self.plateau.std_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl TrainConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: TrainConfig = toml::from_str(s)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidConfig(format!("failed to read {}: {e}", p.display())))?;
        Self::from_toml_str(&s)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("failed to serialize config: {e}")))
    }
}
