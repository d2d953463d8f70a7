//! Configured strategy and portfolio sources.
//!
//! Stand-ins for live collaborators: strategies report the positions listed
//! in the config at readiness, and the portfolio answers with the configured
//! book. Running the engine against them checks a book before go-live.

use std::collections::HashMap;

use strata_core::{Isin, Position, StrategyId};
use strata_strategy::{
    BoxFuture, PortfolioPositions, PortfolioSource, StrategyBuilder, StrategyReporter,
    StrategyResult,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::StrategyConfig;
use crate::error::AppResult;

/// Strategy that reports fixed positions as soon as it starts.
#[derive(Debug, Clone)]
pub struct ConfiguredStrategy {
    id: StrategyId,
    positions: HashMap<Isin, Position>,
}

impl ConfiguredStrategy {
    pub fn new(id: StrategyId, positions: HashMap<Isin, Position>) -> Self {
        Self { id, positions }
    }

    pub fn from_config(config: &StrategyConfig) -> AppResult<Self> {
        Ok(Self::new(config.strategy_id()?, config.positions()?))
    }
}

impl StrategyBuilder for ConfiguredStrategy {
    fn strategy_id(&self) -> StrategyId {
        self.id.clone()
    }

    fn start(&self, reporter: StrategyReporter) -> JoinHandle<()> {
        let positions = self.positions.clone();
        tokio::spawn(async move {
            debug!(strategy = %reporter.id(), positions = positions.len(), "Reporting readiness");
            if let Err(e) = reporter.ready(positions).await {
                warn!(strategy = %reporter.id(), error = %e, "Readiness report failed");
            }
        })
    }
}

/// Portfolio answering with a fixed book.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPortfolio {
    positions: PortfolioPositions,
}

impl ConfiguredPortfolio {
    pub fn new(positions: PortfolioPositions) -> Self {
        Self { positions }
    }
}

impl PortfolioSource for ConfiguredPortfolio {
    fn current_positions(&self) -> BoxFuture<'_, StrategyResult<PortfolioPositions>> {
        Box::pin(async move { Ok(self.positions.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    #[test]
    fn test_from_config() {
        let config = StrategyConfig {
            id: "momentum".to_string(),
            positions: BTreeMap::from([("RIH5".to_string(), dec!(4))]),
        };
        let strategy = ConfiguredStrategy::from_config(&config).unwrap();
        assert_eq!(strategy.strategy_id().as_str(), "momentum");
        assert_eq!(
            strategy.positions[&Isin::new("RIH5").unwrap()],
            Position::new(dec!(4))
        );
    }

    #[test]
    fn test_from_config_rejects_blank_isin() {
        let config = StrategyConfig {
            id: "momentum".to_string(),
            positions: BTreeMap::from([(" ".to_string(), dec!(4))]),
        };
        assert!(ConfiguredStrategy::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_portfolio_returns_book() {
        let isin = Isin::new("SiH5").unwrap();
        let book = PortfolioPositions::from([(isin.clone(), Position::new(dec!(-3)))]);
        let portfolio = ConfiguredPortfolio::new(book.clone());
        assert_eq!(portfolio.current_positions().await.unwrap(), book);
    }
}
