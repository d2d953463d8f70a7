//! Core domain types for the strata trading coordination core.
//!
//! This crate provides the value types shared by the session and strategy
//! processes:
//! - `SessionState`, `IntClearingState`: exchange-reported lifecycle stages
//! - `SessionRecord`, `SessionContent`: raw and decoded session descriptions
//! - `StrategyId`, `Isin`, `SessionId`: opaque identifiers
//! - `Position`: signed, precision-safe quantity per instrument
//! - `Contract`, `ContractSnapshot`: instrument records scoped to a session

pub mod contract;
pub mod error;
pub mod ids;
pub mod position;
pub mod session;

pub use contract::{Contract, ContractSnapshot, InstrumentKind};
pub use error::{CoreError, Result};
pub use ids::{Isin, SessionId, StrategyId};
pub use position::Position;
pub use session::{
    IntClearingState, SessionContent, SessionRecord, SessionState, TradingInterval, Transition,
};
