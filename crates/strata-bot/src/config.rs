//! Application configuration.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_core::{Isin, Position, SessionRecord, StrategyId};
use strata_session::SessionConfig;
use strata_strategy::{PortfolioPositions, StrategyEngineConfig};

use crate::error::{AppError, AppResult};

/// Default config path when neither CLI nor env var names one.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// A strategy with fixed positions reported at readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: String,
    /// isin -> signed quantity.
    #[serde(default)]
    pub positions: BTreeMap<String, Decimal>,
}

impl StrategyConfig {
    pub fn strategy_id(&self) -> AppResult<StrategyId> {
        Ok(StrategyId::new(self.id.clone())?)
    }

    pub fn positions(&self) -> AppResult<HashMap<Isin, Position>> {
        to_positions(&self.positions)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: StrategyEngineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Session to track after preflight. None skips session tracking.
    #[serde(default)]
    pub session_record: Option<SessionRecord>,
    /// Authoritative positions, isin -> signed quantity.
    #[serde(default)]
    pub portfolio: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

impl AppConfig {
    /// Load from the path in `STRATA_CONFIG`, or the default path.
    ///
    /// Falls back to defaults when the file does not exist.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("STRATA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Check values the serde layer cannot.
    pub fn validate(&self) -> AppResult<()> {
        self.engine.validate()?;
        self.session.validate()?;

        let mut ids = BTreeSet::new();
        for strategy in &self.strategies {
            let id = strategy.strategy_id()?;
            if !ids.insert(id.clone()) {
                return Err(AppError::Config(format!("duplicate strategy id: {id}")));
            }
            strategy.positions()?;
        }
        self.portfolio_positions()?;

        if let Some(record) = &self.session_record {
            record.session_state()?;
            record.clearing_state()?;
        }
        Ok(())
    }

    pub fn portfolio_positions(&self) -> AppResult<PortfolioPositions> {
        to_positions(&self.portfolio)
    }
}

fn to_positions(raw: &BTreeMap<String, Decimal>) -> AppResult<HashMap<Isin, Position>> {
    raw.iter()
        .map(|(isin, qty)| Ok((Isin::new(isin.clone())?, Position::new(*qty))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
[engine]
portfolio_timeout_ms = 2000

[portfolio]
RIH5 = 7
SiH5 = "-2.5"

[[strategies]]
id = "momentum"
positions = { RIH5 = 4 }

[[strategies]]
id = "basis"
positions = { RIH5 = 3, SiH5 = "-2.5" }

[session_record]
session_id = 4021
options_session_id = 3021
state = 1
clearing_state = 0
begin = "2025-03-10T07:00:00Z"
end = "2025-03-10T15:45:00Z"
evening_enabled = true
evening_begin = "2025-03-10T16:05:00Z"
evening_end = "2025-03-10T20:50:00Z"
morning_begin = "2025-03-10T00:00:00Z"
morning_end = "2025-03-10T00:00:00Z"
position_transfer_begin = "2025-03-10T15:45:00Z"
position_transfer_end = "2025-03-10T16:00:00Z"
"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.portfolio_timeout_ms, 5_000);
        assert!(config.strategies.is_empty());
        assert!(config.session_record.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.engine.portfolio_timeout_ms, 2000);
        assert_eq!(config.engine.channel_capacity, 256);
        assert_eq!(config.strategies.len(), 2);

        let portfolio = config.portfolio_positions().unwrap();
        assert_eq!(
            portfolio[&Isin::new("SiH5").unwrap()],
            Position::new(dec!(-2.5))
        );

        let record = config.session_record.as_ref().unwrap();
        assert_eq!(record.session_id, 4021);
        assert!(record.evening_enabled);
        assert!(!record.morning_enabled);
    }

    #[test]
    fn test_duplicate_strategy_rejected() {
        let mut config = AppConfig::from_toml(SAMPLE).unwrap();
        config.strategies[1].id = "momentum".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_empty_ids_rejected() {
        let mut config = AppConfig::from_toml(SAMPLE).unwrap();
        config.strategies[0].id = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_toml(SAMPLE).unwrap();
        config.portfolio.insert(String::new(), dec!(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_session_code_rejected() {
        let mut config = AppConfig::from_toml(SAMPLE).unwrap();
        if let Some(record) = config.session_record.as_mut() {
            record.clearing_state = 0x03;
        }
        assert!(matches!(config.validate(), Err(AppError::Core(_))));
    }

    #[test]
    fn test_parse_error_reported() {
        let result = AppConfig::from_toml("strategies = 5");
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
