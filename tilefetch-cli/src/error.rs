//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilefetch::config::ConfigFileError;
use tilefetch::fetch::FetchError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Invalid command line argument
    InvalidArgument(String),
    /// Failed to create the HTTP client
    HttpClient(FetchError),
    /// Failed to read cache statistics
    CacheStats(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(ConfigFileError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!("Fix the value in the config file, or regenerate it with:");
            eprintln!("  tilefetch config init");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "{}", msg),
            CliError::HttpClient(e) => write!(f, "Failed to set up downloads: {}", e),
            CliError::CacheStats(e) => write!(f, "Failed to read cache statistics: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::CacheStats(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err: CliError = ConfigFileError::InvalidValue {
            section: "fetch".to_string(),
            key: "timeout".to_string(),
            value: "soon".to_string(),
            reason: "must be a positive integer".to_string(),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration: fetch.timeout = 'soon' - must be a positive integer"
        );
    }

    #[test]
    fn test_http_client_has_source() {
        let err = CliError::HttpClient(FetchError::Client("tls".to_string()));
        assert!(std::error::Error::source(&err).is_some());
    }
}
