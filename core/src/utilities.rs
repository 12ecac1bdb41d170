//! Utility functions shared by the launcher and its front ends

use tracing::debug;

/// Initialize tracing for the application.
///
/// Events go to stderr so stdout stays free for status lines. `RUST_LOG`
/// takes precedence over `level` when set.
pub fn init_tracing(level: &str) -> crate::Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

    debug!("Tracing initialized with level: {}", level);
    Ok(())
}

/// Create a current timestamp string in RFC3339 format (seconds precision)
pub fn current_timestamp() -> String {
    humantime::format_rfc3339_seconds(std::time::SystemTime::now()).to_string()
}
