//! CLI error types

use launchguard_core::CoreError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CliError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CliError::InvalidArgument(_) => "CLI001",
            CliError::Core(inner) => inner.code(),
            CliError::SerializationError(_) => "CLI002",
        }
    }

    /// Process exit code for this error. Every failure of a single invocation is terminal.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// CLI-specific result type
pub type Result<T> = std::result::Result<T, CliError>;
