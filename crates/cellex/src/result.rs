//! Result and error types for the harness.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while loading, configuring or running suites.
///
/// Dispatch failures of the system under test are *not* harness errors: they are
/// oracle data and travel as [`crate::DispatchError`].
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A case table violates a load-time invariant
    #[error("Invalid case '{id}': {message}")]
    InvalidCase {
        /// Case identifier (or `<unnamed>`)
        id: String,
        /// Error message
        message: String,
    },

    /// A suite document could not be understood
    #[error("Invalid suite '{suite}': {message}")]
    InvalidSuite {
        /// Suite name or file path
        suite: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Fixture placeholder could not be resolved
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create an invalid case error
    #[must_use]
    pub fn invalid_case(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCase {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }
}
