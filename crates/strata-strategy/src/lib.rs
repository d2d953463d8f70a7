//! Strategy orchestration and position reconciliation.
//!
//! The strategy engine starts every configured strategy, waits until each
//! one reports readiness with its positions, fetches the authoritative
//! portfolio, and reconciles the two views before strategies may trade.
//!
//! # Key Components
//!
//! - [`reconcile`]: pure comparison of portfolio and strategy positions
//! - [`StrategyPositions`]: the engine's (strategy, instrument) position table
//! - [`StrategyBuilder`], [`StrategyReporter`]: the strategy reporting contract
//! - [`PortfolioSource`]: the authoritative position collaborator
//! - [`spawn_strategy_engine`], [`StrategyEngineHandle`]: the engine actor

pub mod config;
pub mod engine;
pub mod error;
pub mod portfolio;
pub mod positions;
pub mod reconciliation;
pub mod strategy;

pub use config::StrategyEngineConfig;
pub use engine::{
    spawn_strategy_engine, EngineData, EngineEvent, EngineState, EngineStatus,
    StrategyEngineHandle,
};
pub use error::{StrategyError, StrategyResult};
pub use portfolio::{BoxFuture, DynPortfolioSource, PortfolioSource};
pub use positions::{PortfolioPositions, StrategyPositions};
pub use reconciliation::{reconcile, Mismatch, Reconciliation};
pub use strategy::{DynStrategyBuilder, ManagedStrategy, StrategyBuilder, StrategyReporter};
