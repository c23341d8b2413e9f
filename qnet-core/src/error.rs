//! Error types for the simulation kernel

use thiserror::Error;

/// Top-level error type for kernel operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Rejected at setup, before the scheduler runs.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An orchestration bug, e.g. releasing a slot that was never granted.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid time value: {0} (expected a finite, non-negative number of seconds)")]
    InvalidTime(f64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SimError {
    /// Whether the error must stop the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::InvalidState(_) | SimError::Internal(_))
    }
}
