//! The epoch loop and its plateau handshake.
//!
//! [`TrainingController`] is a synchronous state machine:
//!
//! ```text
//!            step()                       resolve(Continue | ReduceRate)
//! Running ──────────► Running / AwaitingDecision ──────────────────────► Running
//!    │                         │
//!    │ target / max_epochs     │ resolve(Stop)
//!    ▼                         ▼
//! Completed ◄──────────────────┘
//! ```
//!
//! [`TrainingController::run`] drives it to completion against a
//! [`TrainingObserver`], which receives progress and answers plateau prompts.
//! The threaded front-end lives in [`crate::session`].

use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::backprop::Scratch;
use crate::epoch::{check_dataset, run_epoch};
use crate::{Dataset, Error, PlateauDetector, Result, TrainConfig, WeightSet};

/// Factor applied to the learning rate by [`TrainingDecision::ReduceRate`].
pub const RATE_REDUCTION: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Running,
    AwaitingDecision,
    Completed,
}

/// Answer to a plateau prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingDecision {
    /// Resume with the current learning rate.
    Continue,
    /// Multiply the learning rate by [`RATE_REDUCTION`] and resume.
    ReduceRate,
    /// End the run now.
    Stop,
}

/// Why a run reached [`TrainingState::Completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    MaxEpochs,
    Decision,
    StopRequested,
}

/// Result of one [`TrainingController::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    pub mean_error: f32,
    /// State after the epoch.
    pub state: TrainingState,
}

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub weights: WeightSet,
    pub reason: StopReason,
    /// Error of every completed epoch, in order.
    pub history: Vec<f32>,
    /// Learning rate in effect at the end of the run.
    pub learning_rate: f32,
}

impl TrainingOutcome {
    pub fn epochs(&self) -> usize {
        self.history.len()
    }

    pub fn final_error(&self) -> Option<f32> {
        self.history.last().copied()
    }
}

/// Event sink and decision source for [`TrainingController::run`].
pub trait TrainingObserver {
    /// Called after every epoch, in increasing epoch order.
    fn on_progress(&mut self, _epoch: usize, _mean_error: f32) {}

    /// Called when a plateau is detected; training is suspended until this returns.
    fn on_plateau(&mut self, epoch: usize, mean_error: f32) -> Result<TrainingDecision>;
}

/// Owns the weights, error history and plateau detector of one run.
#[derive(Debug, Clone)]
pub struct TrainingController {
    config: TrainConfig,
    weights: WeightSet,
    scratch: Scratch,
    detector: PlateauDetector,
    history: Vec<f32>,
    learning_rate: f32,
    state: TrainingState,
    stop_reason: Option<StopReason>,
}

impl TrainingController {
    /// Validate `config` and initialize weights from `config.seed` (or OS entropy).
    pub fn new(config: TrainConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, &mut rng)
    }

    pub fn with_rng<R: Rng + ?Sized>(config: TrainConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let weights = WeightSet::init(config.topology, rng)?;
        Self::with_weights(config, weights)
    }

    /// Start from existing weights; their topology must match `config`.
    pub fn with_weights(config: TrainConfig, weights: WeightSet) -> Result<Self> {
        config.validate()?;
        if weights.topology() != config.topology {
            return Err(Error::InvalidTopology(format!(
                "weights topology {:?} does not match config topology {:?}",
                weights.topology(),
                config.topology
            )));
        }

        Ok(Self {
            scratch: Scratch::new(config.topology),
            detector: PlateauDetector::new(config.plateau.window, config.plateau.std_threshold),
            history: Vec::with_capacity(config.max_epochs.min(1 << 16)),
            learning_rate: config.learning_rate,
            state: TrainingState::Running,
            stop_reason: None,
            weights,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> TrainingState {
        self.state
    }

    #[inline]
    pub fn weights(&self) -> &WeightSet {
        &self.weights
    }

    /// Learning rate currently in effect.
    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    #[inline]
    pub fn history(&self) -> &[f32] {
        &self.history
    }

    #[inline]
    pub fn epochs_completed(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Fail early if `data` does not fit the configured topology.
    pub fn check_dataset(&self, data: &Dataset) -> Result<()> {
        check_dataset(data, self.config.topology)
    }

    /// Run exactly one epoch and apply the stopping rules.
    ///
    /// Rules are checked in order: target error, plateau, epoch budget.
    pub fn step(&mut self, data: &Dataset) -> Result<EpochReport> {
        if self.state != TrainingState::Running {
            return Err(Error::InvalidState(format!(
                "step called while {:?}",
                self.state
            )));
        }

        let epoch = self.history.len() + 1;
        let mean_error = run_epoch(
            data,
            &mut self.weights,
            self.learning_rate,
            self.config.activation,
            &mut self.scratch,
        )
        .map_err(|e| e.non_finite_at(format!("epoch {epoch}")))?;
        if !mean_error.is_finite() {
            return Err(Error::NonFiniteValue(format!(
                "epoch {epoch}: mean error = {mean_error}"
            )));
        }

        self.history.push(mean_error);
        let plateau = self.detector.observe(mean_error);
        debug!(epoch, mean_error, lr = self.learning_rate, "epoch finished");

        let target = self.config.target_error;
        if target > 0.0 && mean_error <= target {
            self.complete(StopReason::TargetReached);
        } else if plateau {
            self.state = TrainingState::AwaitingDecision;
        } else if epoch >= self.config.max_epochs {
            self.complete(StopReason::MaxEpochs);
        }

        Ok(EpochReport {
            epoch,
            mean_error,
            state: self.state,
        })
    }

    /// Apply the answer to an outstanding plateau prompt.
    ///
    /// The detector window keeps sliding, so a run whose errors stay flat is
    /// prompted again after the next epoch.
    pub fn resolve(&mut self, decision: TrainingDecision) -> Result<()> {
        if self.state != TrainingState::AwaitingDecision {
            return Err(Error::NoPendingDecision);
        }

        let epoch = self.epochs_completed();
        match decision {
            TrainingDecision::Stop => {
                info!(epoch, "plateau decision: stop");
                self.complete(StopReason::Decision);
                return Ok(());
            }
            TrainingDecision::Continue => {
                info!(epoch, "plateau decision: continue");
            }
            TrainingDecision::ReduceRate => {
                self.learning_rate *= RATE_REDUCTION;
                info!(epoch, lr = self.learning_rate, "plateau decision: reduce learning rate");
            }
        }

        if epoch >= self.config.max_epochs {
            self.complete(StopReason::MaxEpochs);
        } else {
            self.state = TrainingState::Running;
        }
        Ok(())
    }

    /// End the run at the current epoch boundary.
    pub fn request_stop(&mut self) {
        if self.state != TrainingState::Completed {
            self.complete(StopReason::StopRequested);
        }
    }

    /// Drive the run to completion.
    ///
    /// `stop` is polled at every epoch boundary and before each plateau prompt;
    /// once set, the run completes with [`StopReason::StopRequested`] without
    /// starting another epoch. A plateau prompt blocks for as long as
    /// `observer.on_plateau` does.
    pub fn run<O: TrainingObserver + ?Sized>(
        mut self,
        data: &Dataset,
        observer: &mut O,
        stop: &AtomicBool,
    ) -> Result<TrainingOutcome> {
        self.check_dataset(data)?;
        info!(
            topology = ?self.config.topology,
            activation = %self.config.activation,
            lr = self.learning_rate,
            max_epochs = self.config.max_epochs,
            samples = data.len(),
            "training started"
        );

        loop {
            match self.state {
                TrainingState::Completed => break,
                TrainingState::Running => {
                    if stop.load(Ordering::SeqCst) {
                        self.request_stop();
                        continue;
                    }
                    let report = self.step(data)?;
                    observer.on_progress(report.epoch, report.mean_error);
                }
                TrainingState::AwaitingDecision => {
                    let epoch = self.epochs_completed();
                    let mean_error = self.history.last().copied().unwrap_or_default();
                    let decision = if stop.load(Ordering::SeqCst) {
                        TrainingDecision::Stop
                    } else {
                        warn!(epoch, mean_error, "plateau detected, waiting for decision");
                        observer.on_plateau(epoch, mean_error)?
                    };
                    if decision == TrainingDecision::Stop && stop.load(Ordering::SeqCst) {
                        self.request_stop();
                    } else {
                        self.resolve(decision)?;
                    }
                }
            }
        }

        let outcome = self.into_outcome()?;
        info!(
            reason = ?outcome.reason,
            epochs = outcome.epochs(),
            final_error = ?outcome.final_error(),
            lr = outcome.learning_rate,
            "training completed"
        );
        Ok(outcome)
    }

    /// Consume a completed controller.
    pub fn into_outcome(self) -> Result<TrainingOutcome> {
        let Some(reason) = self.stop_reason else {
            return Err(Error::InvalidState(format!(
                "run is not completed ({:?})",
                self.state
            )));
        };
        Ok(TrainingOutcome {
            weights: self.weights,
            reason,
            history: self.history,
            learning_rate: self.learning_rate,
        })
    }

    fn complete(&mut self, reason: StopReason) {
        self.state = TrainingState::Completed;
        self.stop_reason = Some(reason);
    }
}
