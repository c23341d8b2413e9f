//! Error types for network components

use qnet_core::SimError;
use qnet_metrics::MetricsError;
use thiserror::Error;

/// Configuration problems found before the simulation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    #[error("Class weights must sum to 1, got {sum}")]
    WeightsDoNotSumToOne { sum: f64 },

    #[error("Station '{station}' requires a bounded number of channels")]
    UnboundedNotAllowed { station: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Errors surfaced while building or running a network.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

pub type ValidationResult<T> = Result<T, ValidationError>;
