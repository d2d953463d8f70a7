//! Error types for strata-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid session state code: {0}")]
    InvalidSessionState(i32),

    #[error("Invalid clearing state code: {0}")]
    InvalidClearingState(i32),

    #[error("Invalid trading interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
