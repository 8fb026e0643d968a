//! CLI error types

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] cleanspawn_core::CoreError),
}

impl CliError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CliError::InvalidArgument(_) => "CLI002",
            CliError::ConfigError(_) => "CLI003",
        }
    }
}

/// CLI-specific result type
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CliError::InvalidArgument("test".to_string()).code(), "CLI002");
        let core = cleanspawn_core::CoreError::ValidationError("test".to_string());
        assert_eq!(CliError::from(core).code(), "CLI003");
    }

    #[test]
    fn test_error_display() {
        let error = CliError::InvalidArgument("executable cannot be empty".to_string());
        assert_eq!(error.to_string(), "Invalid argument: executable cannot be empty");
    }
}
