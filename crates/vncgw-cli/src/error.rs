//! CLI-specific error types and exit codes.

use thiserror::Error;
use vncgw_core::ConfigError;

use crate::flags::FlagError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The application could not be started.
    #[error("Process error: {0}")]
    Process(String),

    /// The gateway server failed.
    #[error("Server error: {0}")]
    Server(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Server(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Process(_) => 71,  // EX_OSERR
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<FlagError> for CliError {
    fn from(err: FlagError) -> Self {
        Self::Arguments(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(config) = err.downcast_ref::<ConfigError>() {
            return Self::Config(config.to_string());
        }
        Self::Server(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
        assert_eq!(CliError::Server("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_config_error_survives_anyhow_context() {
        let err = anyhow::Error::new(ConfigError::ZeroPollInterval)
            .context("invalid gateway configuration");
        let cli = CliError::from(err);
        assert!(matches!(cli, CliError::Config(_)));
    }
}
