//! Instrument records scoped to a session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{Isin, SessionId};

/// Instrument class. Each class has its own contract repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Future,
    Option,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Future => write!(f, "future"),
            Self::Option => write!(f, "option"),
        }
    }
}

/// A tradable contract as listed for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub isin: Isin,
    pub kind: InstrumentKind,
    /// Session the listing belongs to.
    pub session_id: SessionId,
    pub name: String,
}

impl Contract {
    pub fn new(isin: Isin, kind: InstrumentKind, session_id: SessionId, name: impl Into<String>) -> Self {
        Self {
            isin,
            kind,
            session_id,
            name: name.into(),
        }
    }
}

/// Point-in-time set of contracts across all instrument kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub contracts: Vec<Contract>,
}

impl ContractSnapshot {
    pub fn new(contracts: Vec<Contract>) -> Self {
        Self { contracts }
    }

    /// Contracts of one instrument kind, in snapshot order.
    pub fn of_kind(&self, kind: InstrumentKind) -> Vec<Contract> {
        self.contracts
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(isin: &str, kind: InstrumentKind) -> Contract {
        Contract::new(Isin::new(isin).unwrap(), kind, SessionId::new(1), isin)
    }

    #[test]
    fn test_of_kind_filters_and_keeps_order() {
        let snapshot = ContractSnapshot::new(vec![
            contract("RIH5", InstrumentKind::Future),
            contract("RI100000BC5", InstrumentKind::Option),
            contract("SiH5", InstrumentKind::Future),
        ]);

        let futures = snapshot.of_kind(InstrumentKind::Future);
        assert_eq!(futures.len(), 2);
        assert_eq!(futures[0].isin.as_str(), "RIH5");
        assert_eq!(futures[1].isin.as_str(), "SiH5");
        assert_eq!(snapshot.of_kind(InstrumentKind::Option).len(), 1);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(InstrumentKind::Future.to_string(), "future");
        assert_eq!(InstrumentKind::Option.to_string(), "option");
    }
}
