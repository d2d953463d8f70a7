//! Strategy engine error types.

use strata_core::StrategyId;
use thiserror::Error;

use crate::reconciliation::Mismatch;

#[derive(Debug, Error)]
pub enum StrategyError {
    /// Portfolio and strategy positions diverge; carries every mismatch.
    #[error("Reconciliation failed: {} mismatched instrument(s)", .0.len())]
    ReconciliationFailed(Vec<Mismatch>),

    #[error("Portfolio did not respond within {timeout_ms}ms")]
    PortfolioTimeout { timeout_ms: u64 },

    #[error("Portfolio error: {0}")]
    Portfolio(String),

    #[error("Duplicate strategy: {0}")]
    DuplicateStrategy(StrategyId),

    /// Observed through the engine handle after the engine stopped.
    #[error("Strategy engine failed: {0}")]
    EngineFailed(String),

    #[error("Process stopped: {0}")]
    ChannelClosed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type StrategyResult<T> = Result<T, StrategyError>;
