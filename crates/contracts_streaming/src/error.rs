//! Error types for streaming validation.

use contracts_core::ContractError;
use thiserror::Error;

/// Errors that stop a streaming run.
///
/// Transport problems reported by an engine while polling are not errors;
/// they surface as warnings on a window result and the loop continues.
#[derive(Debug, Error)]
pub enum StreamingError {
    /// The contract cannot drive a streaming run
    #[error("Invalid streaming configuration: {0}")]
    Configuration(String),

    /// A dead-letter record could not be delivered
    #[error("Dead-letter delivery failed: {0}")]
    DeadLetter(String),

    /// The engine was used after it was closed
    #[error("Streaming engine is closed")]
    Closed,
}

impl StreamingError {
    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new dead-letter error.
    pub fn dead_letter(message: impl Into<String>) -> Self {
        Self::DeadLetter(message.into())
    }
}

impl From<ContractError> for StreamingError {
    fn from(err: ContractError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type alias for streaming operations.
pub type Result<T> = std::result::Result<T, StreamingError>;
