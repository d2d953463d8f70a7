//! Strategy lifecycle contract.
//!
//! Strategy implementations live outside this crate. The engine only
//! needs to start them and receive their reports:
//!
//! - [`StrategyBuilder`] starts one strategy and returns its task
//! - [`StrategyReporter`] is handed to the strategy for readiness and
//!   incremental position reports
//! - [`ManagedStrategy`] is the engine-owned handle; dropping it aborts the
//!   strategy task, so a strategy never outlives its engine

use std::collections::HashMap;
use std::sync::Arc;

use strata_core::{Isin, Position, StrategyId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{EngineEvent, EngineMsg};
use crate::error::{StrategyError, StrategyResult};

/// Starts one strategy instance.
pub trait StrategyBuilder: Send + Sync {
    fn strategy_id(&self) -> StrategyId;

    /// Spawn the strategy. It must report readiness through `reporter`.
    fn start(&self, reporter: StrategyReporter) -> JoinHandle<()>;
}

/// Arc wrapper for StrategyBuilder trait objects.
pub type DynStrategyBuilder = Arc<dyn StrategyBuilder>;

/// Reporting channel from a strategy into the engine queue.
///
/// Holds a weak sender: strategies cannot keep a stopped engine alive.
#[derive(Clone)]
pub struct StrategyReporter {
    id: StrategyId,
    tx: mpsc::WeakSender<EngineMsg>,
}

impl StrategyReporter {
    pub(crate) fn new(id: StrategyId, tx: mpsc::WeakSender<EngineMsg>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &StrategyId {
        &self.id
    }

    /// Report readiness together with the strategy's current positions.
    pub async fn ready(&self, positions: HashMap<Isin, Position>) -> StrategyResult<()> {
        self.send(EngineEvent::StrategyReady {
            id: self.id.clone(),
            positions,
        })
        .await
    }

    /// Report an incremental position change.
    pub async fn position(&self, isin: Isin, position: Position) -> StrategyResult<()> {
        self.send(EngineEvent::StrategyPosition {
            id: self.id.clone(),
            isin,
            position,
        })
        .await
    }

    async fn send(&self, event: EngineEvent) -> StrategyResult<()> {
        let tx = self
            .tx
            .upgrade()
            .ok_or_else(|| StrategyError::ChannelClosed("strategy engine".to_string()))?;
        tx.send(EngineMsg::Event(event))
            .await
            .map_err(|_| StrategyError::ChannelClosed("strategy engine".to_string()))
    }
}

/// Engine-owned handle to a running strategy.
#[derive(Debug)]
pub struct ManagedStrategy {
    id: StrategyId,
    task: JoinHandle<()>,
}

impl ManagedStrategy {
    pub fn new(id: StrategyId, task: JoinHandle<()>) -> Self {
        Self { id, task }
    }

    pub fn id(&self) -> &StrategyId {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ManagedStrategy {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_dropping_managed_strategy_aborts_task() {
        let (guard_tx, guard_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _guard = guard_tx;
            std::future::pending::<()>().await;
        });

        let managed = ManagedStrategy::new(StrategyId::new("mm-1").unwrap(), task);
        assert!(!managed.is_finished());
        drop(managed);

        // The aborted task drops its guard, closing the channel.
        assert!(guard_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_reporter_fails_when_engine_gone() {
        let (tx, rx) = mpsc::channel::<EngineMsg>(1);
        let reporter = StrategyReporter::new(StrategyId::new("mm-1").unwrap(), tx.downgrade());
        drop(tx);
        drop(rx);

        let result = reporter.ready(HashMap::new()).await;
        assert!(matches!(result, Err(StrategyError::ChannelClosed(_))));
    }
}
