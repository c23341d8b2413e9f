//! Error types for statistics recording and export

use thiserror::Error;

/// Errors related to statistics collection and export
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A recorder was asked to do something its current state forbids,
    /// such as recording an exit with nobody in the network.
    #[error("Invalid recorder state: {0}")]
    InvalidState(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
