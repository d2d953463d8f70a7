//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] strata_core::CoreError),

    #[error("Session error: {0}")]
    Session(#[from] strata_session::SessionError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] strata_strategy::StrategyError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] strata_telemetry::TelemetryError),

    #[error("Preflight error: {0}")]
    Preflight(String),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type AppResult<T> = Result<T, AppError>;
