//! A single-hidden-layer MLP trainer with an interactive plateau handshake.
//!
//! `plateau-mlp` trains a dense `input -> hidden -> output` network with online
//! gradient descent. When the epoch error stops moving, training pauses and asks
//! an external decision maker whether to continue, cut the learning rate by 10%,
//! or stop. Weights and the epoch counter survive the pause.
//!
//! # Layers of API
//!
//! - Building blocks: [`ActivationKind`], [`WeightSet::init`], [`forward`],
//!   [`backprop_step`], [`run_epoch`], [`PlateauDetector`].
//! - [`TrainingController`]: the synchronous epoch loop and state machine. Drive
//!   it by hand with `step` / `resolve`, or hand it a [`TrainingObserver`].
//! - [`TrainingSession`]: runs a controller on its own thread and exposes the
//!   handshake through a [`TrainingHandle`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - [`Dataset`] stores samples contiguously in row-major layout.
//! - `W1` is `(n_hidden, n_in)` and `W2` is `(n_out, n_hidden)`, both row-major.
//!
//! # Logging
//!
//! The crate emits `tracing` events (run start/end, decisions, plateaus at
//! `warn`, per-epoch errors at `debug`) and never installs a subscriber.
//!
//! # Quick start
//!
//! ```rust
//! use plateau_mlp::{
//!     ActivationKind, Dataset, TrainConfig, TrainingEvent, TrainingDecision, TrainingSession,
//!     Topology,
//! };
//!
//! # fn main() -> plateau_mlp::Result<()> {
//! let xs = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
//! let ys = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
//! let data = Dataset::from_rows(&xs, &ys)?;
//!
//! let config = TrainConfig::new(Topology::new(2, 2, 2)?)
//!     .learning_rate(0.5)
//!     .max_epochs(2_000)
//!     .activation(ActivationKind::Logistic)
//!     .target_error(0.01)
//!     .seed(0);
//!
//! let handle = TrainingSession::spawn(config, data)?;
//! while let Some(event) = handle.recv() {
//!     match event {
//!         TrainingEvent::Progress { .. } => {}
//!         TrainingEvent::Plateau { .. } => handle.decide(TrainingDecision::Continue)?,
//!         TrainingEvent::Completed(_) | TrainingEvent::Failed(_) => break,
//!     }
//! }
//! let outcome = handle.join()?;
//! assert!(outcome.final_error().unwrap() <= 0.01);
//! # Ok(())
//! # }
//! ```
//!
//! # Driving the controller directly
//!
//! ```rust
//! use plateau_mlp::{Dataset, TrainConfig, TrainingController, TrainingDecision, TrainingState, Topology};
//!
//! # fn main() -> plateau_mlp::Result<()> {
//! let data = Dataset::from_rows(&[vec![0.5]], &[vec![1.0]])?;
//! let config = TrainConfig::new(Topology::new(1, 1, 1)?)
//!     .max_epochs(50)
//!     .plateau(3, 1.0)
//!     .seed(1);
//! let mut ctl = TrainingController::new(config)?;
//!
//! while ctl.state() != TrainingState::Completed {
//!     match ctl.state() {
//!         TrainingState::Running => {
//!             ctl.step(&data)?;
//!         }
//!         TrainingState::AwaitingDecision => ctl.resolve(TrainingDecision::Stop)?,
//!         TrainingState::Completed => {}
//!     }
//! }
//! assert_eq!(ctl.epochs_completed(), 3);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod backprop;
pub mod config;
pub mod controller;
pub mod data;
pub mod epoch;
pub mod error;
pub mod forward;
pub mod metrics;
pub mod plateau;
pub mod session;
pub mod weights;

pub use activation::ActivationKind;
pub use backprop::{Scratch, backprop_step};
pub use config::{PlateauConfig, TrainConfig};
pub use controller::{
    EpochReport, RATE_REDUCTION, StopReason, TrainingController, TrainingDecision,
    TrainingObserver, TrainingOutcome, TrainingState,
};
pub use data::Dataset;
pub use epoch::run_epoch;
pub use error::{Error, Result};
pub use forward::{Activations, forward, forward_into};
pub use metrics::{EvalReport, argmax, classify, evaluate, predict_classes};
pub use plateau::PlateauDetector;
pub use session::{TrainingEvent, TrainingHandle, TrainingSession};
pub use weights::{Topology, WeightSet};
