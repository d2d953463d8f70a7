//! Position reconciliation.
//!
//! Compares the authoritative portfolio against the per-instrument
//! aggregate of strategy positions. Instruments missing on either side are
//! flat on that side. The result lists mismatches ordered by isin, so
//! identical inputs always produce identical output regardless of map
//! iteration order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strata_core::{Isin, Position, StrategyId};

use crate::positions::{PortfolioPositions, StrategyPositions};

/// Divergence for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub isin: Isin,
    pub portfolio_position: Position,
    pub strategies_position: Position,
    /// Per-strategy positions that sum to `strategies_position`.
    pub allocation: BTreeMap<StrategyId, Position>,
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reconciliation {
    Reconciled,
    /// Non-empty, ordered by isin.
    Mismatched(Vec<Mismatch>),
}

impl Reconciliation {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled)
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        match self {
            Self::Reconciled => &[],
            Self::Mismatched(mismatches) => mismatches,
        }
    }
}

/// Reconcile portfolio positions against strategy positions.
pub fn reconcile(portfolio: &PortfolioPositions, strategies: &StrategyPositions) -> Reconciliation {
    let mut by_instrument = strategies.by_instrument();

    let instruments: BTreeSet<Isin> = portfolio
        .keys()
        .cloned()
        .chain(by_instrument.keys().cloned())
        .collect();

    let mismatches: Vec<Mismatch> = instruments
        .into_iter()
        .filter_map(|isin| {
            let portfolio_position = portfolio.get(&isin).copied().unwrap_or(Position::FLAT);
            let allocation = by_instrument.remove(&isin).unwrap_or_default();
            let strategies_position: Position = allocation.values().sum();

            (portfolio_position != strategies_position).then_some(Mismatch {
                isin,
                portfolio_position,
                strategies_position,
                allocation,
            })
        })
        .collect();

    if mismatches.is_empty() {
        Reconciliation::Reconciled
    } else {
        Reconciliation::Mismatched(mismatches)
    }
}
