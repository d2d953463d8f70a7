//! Strategy engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{StrategyError, StrategyResult};

/// Strategy engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyEngineConfig {
    /// Portfolio position request timeout (ms). Default: 5,000.
    #[serde(default = "default_portfolio_timeout_ms")]
    pub portfolio_timeout_ms: u64,
    /// Engine inbound queue capacity. Default: 256.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_portfolio_timeout_ms() -> u64 {
    5_000
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for StrategyEngineConfig {
    fn default() -> Self {
        Self {
            portfolio_timeout_ms: default_portfolio_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl StrategyEngineConfig {
    pub fn portfolio_timeout(&self) -> Duration {
        Duration::from_millis(self.portfolio_timeout_ms)
    }

    pub fn validate(&self) -> StrategyResult<()> {
        if self.portfolio_timeout_ms == 0 {
            return Err(StrategyError::InvalidConfig(
                "portfolio_timeout_ms must be positive".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(StrategyError::InvalidConfig(
                "channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
