//! Core error types and utilities

use thiserror::Error;

/// Core-specific error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// A required argument was missing or unusable as an identity key
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The project directory the worker runs in is missing or unreachable
    #[error("Environment error: {0}")]
    EnvironmentError(String),

    /// The runner could not be started
    #[error("Spawn failure: {0}")]
    SpawnFailure(String),

    /// Another launcher holds the per-key lock
    #[error("Lock contention: {0}")]
    LockContention(String),

    /// Signalling a recorded worker failed
    #[error("Process signal error: {0}")]
    ProcessSignal(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CoreError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidArgument(_) => "LG001",
            CoreError::EnvironmentError(_) => "LG002",
            CoreError::SpawnFailure(_) => "LG003",
            CoreError::LockContention(_) => "LG004",
            CoreError::ProcessSignal(_) => "LG005",
            CoreError::ConfigurationError(_) => "LG006",
            CoreError::ValidationError(_) => "LG007",
            CoreError::InitializationError(_) => "LG008",
            CoreError::IoError(_) => "LG009",
            CoreError::SerializationError(_) => "LG010",
        }
    }

    /// Wrap an I/O error with the path or action it relates to, keeping its kind
    pub(crate) fn io_context(err: std::io::Error, context: impl std::fmt::Display) -> Self {
        CoreError::IoError(std::io::Error::new(err.kind(), format!("{context}: {err}")))
    }
}

/// Core-specific result type
pub type Result<T> = std::result::Result<T, CoreError>;
