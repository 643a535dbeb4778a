//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// One or more suites did not pass
    #[error("Suite run failed: {message}")]
    SuiteFailed {
        /// Error message
        message: String,
    },

    /// Browser session could not be started or closed
    #[error("Browser session error: {0}")]
    Browser(#[from] cellex::page::DriverError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness library error
    #[error("{0}")]
    Harness(#[from] cellex::HarnessError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a suite failure
    #[must_use]
    pub fn suite_failed(message: impl Into<String>) -> Self {
        Self::SuiteFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_the_file() {
        let err = CliError::config("suites/login.yaml: duplicate case id LOGIN_OK");
        assert_eq!(
            err.to_string(),
            "Configuration error: suites/login.yaml: duplicate case id LOGIN_OK"
        );
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("1 of 3 suite file(s) invalid");
        assert!(matches!(err, CliError::InvalidArgument { .. }));
        assert!(err.to_string().ends_with("1 of 3 suite file(s) invalid"));
    }

    #[test]
    fn test_suite_failed_error() {
        let err = CliError::suite_failed("2 case(s) failed");
        assert_eq!(err.to_string(), "Suite run failed: 2 case(s) failed");
    }

    #[test]
    fn test_harness_error_from() {
        let err: CliError = cellex::HarnessError::config("CELLEX_API_URL is invalid").into();
        assert!(err.to_string().contains("CELLEX_API_URL"));
    }

    #[test]
    fn test_report_write_error_from() {
        let err: CliError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "report.xml").into();
        assert!(matches!(err, CliError::Io(_)));
        assert!(err.to_string().contains("report.xml"));
    }

    #[test]
    fn test_browser_error_from() {
        let selector = cellex::page::Selector::css("#login");
        let err: CliError = cellex::page::DriverError::not_found(&selector).into();
        assert!(err.to_string().starts_with("Browser session error"));
    }
}
