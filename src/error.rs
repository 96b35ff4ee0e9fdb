use std::time::Duration;

use thiserror::Error;

/// Errors produced while configuring or running a training run.
///
/// The enum is `Clone` so a mid-run failure can be forwarded to the caller
/// inside a [`crate::TrainingEvent::Failed`] event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("dimension mismatch: {what} has len {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("non-finite value: {0}")]
    NonFiniteValue(String),

    #[error("no plateau decision for epoch {epoch} after {waited:?}")]
    StalledHandshake { epoch: usize, waited: Duration },

    #[error("no plateau decision is pending")]
    NoPendingDecision,

    #[error("invalid controller state: {0}")]
    InvalidState(String),

    #[error("training worker: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Prefix the message of a `NonFiniteValue` with where it happened.
    pub(crate) fn non_finite_at(self, location: impl std::fmt::Display) -> Self {
        match self {
            Error::NonFiniteValue(msg) => Error::NonFiniteValue(format!("{location}: {msg}")),
            other => other,
        }
    }
}
