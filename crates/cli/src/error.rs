//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Some durable logs were not removed
    #[error("{refused} file(s) could not be removed")]
    FilesRefused { refused: usize },

    /// Driver operation error
    #[error(transparent)]
    Driver(#[from] driver::DriverError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CliError::config_not_found("driver.toml").to_string(),
            "Configuration file not found: driver.toml"
        );
        assert_eq!(
            CliError::FilesRefused { refused: 2 }.to_string(),
            "2 file(s) could not be removed"
        );
        let err: CliError = driver::DriverError::LoggingDisabled.into();
        assert!(err.to_string().contains("disabled"));
    }
}
