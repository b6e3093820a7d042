//! Error types for validation operations.
//!
//! Data problems never surface here; they are reported as violation strings.
//! These errors cover runs that cannot proceed at all.

use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Invalid run options
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A chunk source could not be read or decoded
    #[error("Failed to read {location}: {message}")]
    Source { location: String, message: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic validation error
    #[error("Validation error: {0}")]
    General(String),
}

impl ValidationError {
    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new source error.
    pub fn unreadable(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
