//! Position tables.

use std::collections::{BTreeMap, HashMap};

use strata_core::{Isin, Position, StrategyId};

/// Authoritative positions per instrument.
pub type PortfolioPositions = HashMap<Isin, Position>;

/// Positions reported by strategies, keyed by (strategy, instrument).
///
/// Owned by the strategy engine; the only table any engine event writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyPositions {
    positions: HashMap<(StrategyId, Isin), Position>,
}

impl StrategyPositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite a position, returning the previous one.
    pub fn record(&mut self, strategy: StrategyId, isin: Isin, position: Position) -> Option<Position> {
        self.positions.insert((strategy, isin), position)
    }

    pub fn get(&self, strategy: &StrategyId, isin: &Isin) -> Option<Position> {
        self.positions
            .get(&(strategy.clone(), isin.clone()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StrategyId, &Isin, Position)> {
        self.positions.iter().map(|((s, i), p)| (s, i, *p))
    }

    /// Per-instrument breakdown: isin -> (strategy -> position).
    pub fn by_instrument(&self) -> BTreeMap<Isin, BTreeMap<StrategyId, Position>> {
        let mut index: BTreeMap<Isin, BTreeMap<StrategyId, Position>> = BTreeMap::new();
        for ((strategy, isin), position) in &self.positions {
            index
                .entry(isin.clone())
                .or_default()
                .insert(strategy.clone(), *position);
        }
        index
    }

    /// Aggregate of every strategy's position in `isin`; flat if none.
    pub fn aggregate(&self, isin: &Isin) -> Position {
        self.positions
            .iter()
            .filter(|((_, i), _)| i == isin)
            .map(|(_, p)| *p)
            .sum()
    }
}

impl FromIterator<(StrategyId, Isin, Position)> for StrategyPositions {
    fn from_iter<T: IntoIterator<Item = (StrategyId, Isin, Position)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (strategy, isin, position) in iter {
            table.record(strategy, isin, position);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> StrategyId {
        StrategyId::new(s).unwrap()
    }

    fn isin(s: &str) -> Isin {
        Isin::new(s).unwrap()
    }

    #[test]
    fn test_record_overwrites() {
        let mut table = StrategyPositions::new();
        assert_eq!(table.record(sid("a"), isin("RIH5"), Position::from(3)), None);
        assert_eq!(
            table.record(sid("a"), isin("RIH5"), Position::from(5)),
            Some(Position::from(3))
        );
        assert_eq!(table.get(&sid("a"), &isin("RIH5")), Some(Position::from(5)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_aggregate_and_breakdown() {
        let table: StrategyPositions = [
            (sid("a"), isin("RIH5"), Position::from(4)),
            (sid("b"), isin("RIH5"), Position::from(3)),
            (sid("b"), isin("SiH5"), Position::from(-2)),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.aggregate(&isin("RIH5")), Position::from(7));
        assert_eq!(table.aggregate(&isin("SiH5")), Position::from(-2));
        assert_eq!(table.aggregate(&isin("BRK5")), Position::FLAT);

        let index = table.by_instrument();
        assert_eq!(index.len(), 2);
        assert_eq!(index[&isin("RIH5")].len(), 2);
        assert_eq!(index[&isin("SiH5")][&sid("b")], Position::from(-2));
    }
}
