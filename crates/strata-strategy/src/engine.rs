//! Strategy engine actor.
//!
//! Orchestrates strategy activation as a state machine:
//!
//! ```text
//! Idle --Prepare--> Preparing --(all ready)--> Reconciling --Reconciled--> StrategiesReady
//!                                                   |
//!                                                   +--Mismatched / portfolio failure--> stop
//! ```
//!
//! - `Prepare` starts every configured strategy in order and waits for a
//!   readiness report from each (`EngineData::AwaitingReadiness`).
//! - When the awaiting set empties, the portfolio is requested on a
//!   separate task bounded by the configured timeout; the response (or the
//!   timeout) re-enters the engine queue as `EngineEvent::PortfolioPositions`.
//! - `StrategyPosition` is recorded in every state, including
//!   StrategiesReady, without changing state.
//! - StrategiesReady absorbs every other event.
//!
//! A mismatch or a portfolio failure stops the engine. The error is
//! returned from the task and published as `EngineStatus::Failed` so the
//! supervisor sees the stop reason; managed strategies are aborted.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use strata_core::{Isin, Position, StrategyId};
use strata_telemetry::Metrics;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::StrategyEngineConfig;
use crate::error::{StrategyError, StrategyResult};
use crate::portfolio::DynPortfolioSource;
use crate::positions::{PortfolioPositions, StrategyPositions};
use crate::reconciliation::{reconcile, Reconciliation};
use crate::strategy::{DynStrategyBuilder, ManagedStrategy, StrategyReporter};

// ============================================================================
// State / Data / Events
// ============================================================================

/// Strategy engine lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Idle,
    Preparing,
    Reconciling,
    /// Absorbing for this activation cycle.
    StrategiesReady,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Reconciling => "reconciling",
            Self::StrategiesReady => "strategies_ready",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data carried alongside the engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineData {
    Void,
    /// Strategies that have not reported readiness yet.
    AwaitingReadiness(BTreeSet<StrategyId>),
}

/// Published engine status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Running(EngineState),
    /// Stopped with the given reason.
    Failed(String),
}

/// Events handled by the engine.
#[derive(Debug)]
pub enum EngineEvent {
    /// Start every configured strategy.
    Prepare,
    /// A strategy is ready, with its positions at that moment.
    StrategyReady {
        id: StrategyId,
        positions: HashMap<Isin, Position>,
    },
    /// Unsolicited position update from a strategy.
    StrategyPosition {
        id: StrategyId,
        isin: Isin,
        position: Position,
    },
    /// Portfolio response, or the failure that replaced it. Handling it in
    /// Reconciling runs the reconciliation: Reconciled moves to
    /// StrategiesReady, Mismatched fails the engine.
    PortfolioPositions(StrategyResult<PortfolioPositions>),
}

/// Messages for the engine actor.
#[derive(Debug)]
pub(crate) enum EngineMsg {
    Event(EngineEvent),
    /// Query the position table.
    Positions(oneshot::Sender<StrategyPositions>),
    Shutdown,
}

// ============================================================================
// StrategyEngineTask
// ============================================================================

struct StrategyEngineTask {
    rx: mpsc::Receiver<EngineMsg>,
    /// Weak so in-flight requests and reporters never keep the engine alive.
    self_tx: mpsc::WeakSender<EngineMsg>,
    config: StrategyEngineConfig,
    builders: Vec<DynStrategyBuilder>,
    portfolio: DynPortfolioSource,

    state: EngineState,
    data: EngineData,
    strategies: BTreeMap<StrategyId, ManagedStrategy>,
    positions: StrategyPositions,

    status_tx: watch::Sender<EngineStatus>,
}

impl StrategyEngineTask {
    async fn run(mut self) -> StrategyResult<()> {
        debug!(strategies = self.builders.len(), "StrategyEngineTask started");

        let result = loop {
            match self.rx.recv().await {
                Some(EngineMsg::Event(event)) => {
                    if let Err(e) = self.handle_event(event) {
                        break Err(e);
                    }
                }
                Some(EngineMsg::Positions(reply)) => {
                    let _ = reply.send(self.positions.clone());
                }
                Some(EngineMsg::Shutdown) | None => break Ok(()),
            }
        };

        if let Err(e) = &result {
            error!(state = %self.state, error = %e, "Strategy engine stopped");
            self.status_tx.send_replace(EngineStatus::Failed(e.to_string()));
        }

        // Abort every strategy still running.
        self.strategies.clear();

        debug!(state = %self.state, "StrategyEngineTask terminated");
        result
    }

    /// Transition function over (state, event).
    fn handle_event(&mut self, event: EngineEvent) -> StrategyResult<()> {
        match (self.state, event) {
            (
                _,
                EngineEvent::StrategyPosition {
                    id,
                    isin,
                    position,
                },
            ) => {
                self.on_strategy_position(id, isin, position);
                Ok(())
            }
            (EngineState::Idle, EngineEvent::Prepare) => {
                self.on_prepare();
                Ok(())
            }
            (EngineState::Preparing, EngineEvent::StrategyReady { id, positions }) => {
                self.on_strategy_ready(id, positions);
                Ok(())
            }
            (EngineState::Reconciling, EngineEvent::PortfolioPositions(result)) => {
                self.on_portfolio_positions(result)
            }
            (EngineState::StrategiesReady, event) => {
                debug!(event = ?event, "Strategies ready, event discarded");
                Ok(())
            }
            (state, event) => {
                warn!(state = %state, event = ?event, "Unhandled strategy engine event");
                Ok(())
            }
        }
    }

    fn on_strategy_position(&mut self, id: StrategyId, isin: Isin, position: Position) {
        debug!(
            strategy = %id,
            isin = %isin,
            position = %position,
            state = %self.state,
            "Strategy position recorded"
        );
        self.positions.record(id, isin, position);
    }

    /// Start strategies one at a time, in configured order.
    fn on_prepare(&mut self) {
        let mut awaiting = BTreeSet::new();

        for builder in &self.builders {
            let id = builder.strategy_id();
            let reporter = StrategyReporter::new(id.clone(), self.self_tx.clone());
            let task = builder.start(reporter);

            info!(strategy = %id, "Strategy started");
            self.strategies
                .insert(id.clone(), ManagedStrategy::new(id.clone(), task));
            awaiting.insert(id);
        }

        self.transition(EngineState::Preparing, EngineData::AwaitingReadiness(awaiting));
        self.check_readiness();
    }

    fn on_strategy_ready(&mut self, id: StrategyId, positions: HashMap<Isin, Position>) {
        info!(strategy = %id, positions = positions.len(), "Strategy ready");

        for (isin, position) in positions {
            self.positions.record(id.clone(), isin, position);
        }

        if let EngineData::AwaitingReadiness(awaiting) = &mut self.data {
            if !awaiting.remove(&id) {
                warn!(strategy = %id, "Readiness from strategy not awaited");
            }
        }
        self.check_readiness();
    }

    /// Move to Reconciling once no strategy is awaited.
    fn check_readiness(&mut self) {
        let remaining = match &self.data {
            EngineData::AwaitingReadiness(awaiting) => awaiting.len(),
            EngineData::Void => return,
        };

        if remaining > 0 {
            debug!(remaining, "Awaiting strategy readiness");
            return;
        }

        self.request_portfolio();
        self.transition(EngineState::Reconciling, EngineData::Void);
    }

    /// Request the portfolio snapshot without blocking the engine.
    fn request_portfolio(&self) {
        let portfolio = self.portfolio.clone();
        let tx = self.self_tx.clone();
        let timeout = self.config.portfolio_timeout();
        let timeout_ms = self.config.portfolio_timeout_ms;

        debug!(timeout_ms, "Requesting portfolio positions");

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, portfolio.current_positions()).await {
                Ok(Ok(positions)) => {
                    Metrics::portfolio_request("ok");
                    Ok(positions)
                }
                Ok(Err(e)) => {
                    Metrics::portfolio_request("error");
                    Err(e)
                }
                Err(_) => {
                    Metrics::portfolio_request("timeout");
                    Err(StrategyError::PortfolioTimeout { timeout_ms })
                }
            };

            match tx.upgrade() {
                Some(tx) => {
                    let _ = tx
                        .send(EngineMsg::Event(EngineEvent::PortfolioPositions(result)))
                        .await;
                }
                None => debug!("Strategy engine gone, portfolio response dropped"),
            }
        });
    }

    fn on_portfolio_positions(
        &mut self,
        result: StrategyResult<PortfolioPositions>,
    ) -> StrategyResult<()> {
        let portfolio = result.map_err(|e| {
            Metrics::reconciliation("failed", 0);
            e
        })?;

        match reconcile(&portfolio, &self.positions) {
            Reconciliation::Reconciled => {
                Metrics::reconciliation("reconciled", 0);
                info!(
                    instruments = portfolio.len(),
                    strategy_positions = self.positions.len(),
                    "Positions reconciled"
                );
                self.transition(EngineState::StrategiesReady, EngineData::Void);
                Ok(())
            }
            Reconciliation::Mismatched(mismatches) => {
                Metrics::reconciliation("mismatched", mismatches.len());
                for m in &mismatches {
                    error!(
                        isin = %m.isin,
                        portfolio_position = %m.portfolio_position,
                        strategies_position = %m.strategies_position,
                        allocation = ?m.allocation,
                        "Position mismatch"
                    );
                }
                Err(StrategyError::ReconciliationFailed(mismatches))
            }
        }
    }

    fn transition(&mut self, next: EngineState, data: EngineData) {
        let from = self.state;
        self.state = next;
        self.data = data;

        info!(from = %from, to = %next, "Strategy engine transition");
        Metrics::engine_transition(from.as_str(), next.as_str());
        self.status_tx.send_replace(EngineStatus::Running(next));
    }
}

// ============================================================================
// StrategyEngineHandle
// ============================================================================

/// Handle for the strategy engine.
#[derive(Clone)]
pub struct StrategyEngineHandle {
    tx: mpsc::Sender<EngineMsg>,
    status_rx: watch::Receiver<EngineStatus>,
}

impl StrategyEngineHandle {
    /// Start every configured strategy.
    pub async fn prepare(&self) -> StrategyResult<()> {
        self.send(EngineMsg::Event(EngineEvent::Prepare)).await
    }

    pub fn status(&self) -> EngineStatus {
        self.status_rx.borrow().clone()
    }

    /// Current state, or `None` once the engine failed.
    pub fn state(&self) -> Option<EngineState> {
        match &*self.status_rx.borrow() {
            EngineStatus::Running(state) => Some(*state),
            EngineStatus::Failed(_) => None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status_rx.clone()
    }

    /// Snapshot of the strategy position table.
    pub async fn positions(&self) -> StrategyResult<StrategyPositions> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineMsg::Positions(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| StrategyError::ChannelClosed("strategy engine".to_string()))
    }

    /// Wait until strategies are ready, or return the failure that stopped
    /// the engine.
    pub async fn wait_until_settled(&self) -> StrategyResult<()> {
        let mut rx = self.status_rx.clone();
        loop {
            if let Some(result) = Self::settled(&rx.borrow_and_update()) {
                return result;
            }
            if rx.changed().await.is_err() {
                return Self::settled(&rx.borrow()).unwrap_or_else(|| {
                    Err(StrategyError::ChannelClosed("strategy engine".to_string()))
                });
            }
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(EngineMsg::Shutdown).await;
    }

    fn settled(status: &EngineStatus) -> Option<StrategyResult<()>> {
        match status {
            EngineStatus::Running(EngineState::StrategiesReady) => Some(Ok(())),
            EngineStatus::Running(_) => None,
            EngineStatus::Failed(reason) => Some(Err(StrategyError::EngineFailed(reason.clone()))),
        }
    }

    async fn send(&self, msg: EngineMsg) -> StrategyResult<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| StrategyError::ChannelClosed("strategy engine".to_string()))
    }
}

/// Spawn a strategy engine in Idle.
///
/// Strategy ids must be unique across `builders`.
pub fn spawn_strategy_engine(
    config: StrategyEngineConfig,
    builders: Vec<DynStrategyBuilder>,
    portfolio: DynPortfolioSource,
) -> StrategyResult<(StrategyEngineHandle, JoinHandle<StrategyResult<()>>)> {
    config.validate()?;

    let mut seen = BTreeSet::new();
    for builder in &builders {
        let id = builder.strategy_id();
        if !seen.insert(id.clone()) {
            return Err(StrategyError::DuplicateStrategy(id));
        }
    }

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let (status_tx, status_rx) = watch::channel(EngineStatus::Running(EngineState::Idle));

    let task = StrategyEngineTask {
        rx,
        self_tx: tx.downgrade(),
        config,
        builders,
        portfolio,
        state: EngineState::Idle,
        data: EngineData::Void,
        strategies: BTreeMap::new(),
        positions: StrategyPositions::new(),
        status_tx,
    };
    let join_handle = tokio::spawn(task.run());

    Ok((StrategyEngineHandle { tx, status_rx }, join_handle))
}

// ============================================================================
// Tests
// ============================================================================
