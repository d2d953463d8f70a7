//! Authoritative portfolio collaborator.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::StrategyResult;
use crate::positions::PortfolioPositions;

/// Boxed future type for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of the authoritative position snapshot.
///
/// The engine bounds every request with its configured timeout, so
/// implementations need not enforce one.
pub trait PortfolioSource: Send + Sync {
    /// Current position per instrument. Instruments not listed are flat.
    fn current_positions(&self) -> BoxFuture<'_, StrategyResult<PortfolioPositions>>;
}

/// Arc wrapper for PortfolioSource trait objects.
pub type DynPortfolioSource = Arc<dyn PortfolioSource>;
