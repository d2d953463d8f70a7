//! Main application orchestration.
//!
//! Coordinates the processes of a trading day:
//! - Strategy engine activation and preflight reconciliation
//! - Session process tree for the configured session record

use std::sync::Arc;

use strata_session::{spawn_session_from_record, SessionHandle, SessionResult};
use strata_strategy::{
    spawn_strategy_engine, DynPortfolioSource, DynStrategyBuilder, EngineState, StrategyEngineHandle,
    StrategyError, StrategyResult,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::sources::{ConfiguredPortfolio, ConfiguredStrategy};

/// Main application.
pub struct Application {
    config: AppConfig,
    engine: Option<(StrategyEngineHandle, JoinHandle<StrategyResult<()>>)>,
}

impl Application {
    /// Create a new application.
    ///
    /// Call `run_preflight()` before `run()`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engine: None,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Engine handle, present once preflight succeeded.
    pub fn engine(&self) -> Option<&StrategyEngineHandle> {
        self.engine.as_ref().map(|(handle, _)| handle)
    }

    /// Activate strategies and reconcile them against the portfolio.
    ///
    /// On a mismatch the full report is logged and the engine error is
    /// returned; the engine is gone afterwards.
    pub async fn run_preflight(&mut self) -> AppResult<()> {
        if self.engine.is_some() {
            info!("Strategies already active, skipping preflight");
            return Ok(());
        }

        let builders = self
            .config
            .strategies
            .iter()
            .map(|s| ConfiguredStrategy::from_config(s).map(|b| Arc::new(b) as DynStrategyBuilder))
            .collect::<AppResult<Vec<_>>>()?;
        let portfolio: DynPortfolioSource =
            Arc::new(ConfiguredPortfolio::new(self.config.portfolio_positions()?));

        info!(
            strategies = builders.len(),
            timeout_ms = self.config.engine.portfolio_timeout_ms,
            "Running preflight reconciliation"
        );

        let (handle, join) = spawn_strategy_engine(self.config.engine.clone(), builders, portfolio)?;
        handle.prepare().await?;

        if let Err(settle_err) = handle.wait_until_settled().await {
            // The task result carries the typed error, the status only its text.
            let err = match join.await {
                Ok(Err(err)) => err,
                Ok(Ok(())) => settle_err,
                Err(join_err) => return Err(join_err.into()),
            };
            report_failure(&err);
            return Err(err.into());
        }

        let positions = handle.positions().await?;
        info!(records = positions.len(), "Preflight reconciliation passed");

        self.engine = Some((handle, join));
        Ok(())
    }

    /// Spawn the session process tree for the configured record, if any.
    pub fn start_session(
        &self,
    ) -> AppResult<Option<(SessionHandle, JoinHandle<SessionResult<()>>)>> {
        let Some(record) = &self.config.session_record else {
            info!("No session record configured");
            return Ok(None);
        };
        let (handle, join) = spawn_session_from_record(record, &self.config.session)?;
        info!(
            session_id = %handle.id(),
            state = %handle.state(),
            clearing_state = %handle.clearing().state(),
            "Session tracking started"
        );
        Ok(Some((handle, join)))
    }

    /// Run until interrupted or until a process stops.
    pub async fn run(mut self) -> AppResult<()> {
        let Some((engine, mut engine_join)) = self.engine.take() else {
            return Err(AppError::Preflight(
                "Strategies not active. Call run_preflight() first.".to_string(),
            ));
        };
        if engine.state() != Some(EngineState::StrategiesReady) {
            return Err(AppError::Preflight(format!(
                "Strategy engine not ready: {:?}",
                engine.status()
            )));
        }

        let (session, mut session_join) = match self.start_session()? {
            Some((handle, join)) => (Some(handle), Some(join)),
            None => (None, None),
        };

        info!("Entering main loop");
        let result = tokio::select! {
            result = &mut engine_join => {
                let result = flatten(result);
                if let Err(ref e) = result {
                    error!(error = %e, "Strategy engine stopped");
                } else {
                    warn!("Strategy engine stopped");
                }
                result
            }
            result = wait_optional(session_join.as_mut()) => {
                let result = flatten(result);
                if let Err(ref e) = result {
                    error!(error = %e, "Session process stopped");
                } else {
                    info!("Session process finished");
                }
                result
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        info!("Shutting down");
        if let Some(session) = session {
            session.shutdown().await;
        }
        engine.shutdown().await;

        if let Some(join) = session_join {
            if !join.is_finished() {
                if let Err(e) = join.await {
                    warn!(error = %e, "Session task join failed");
                }
            }
        }
        if !engine_join.is_finished() {
            if let Err(e) = engine_join.await {
                warn!(error = %e, "Engine task join failed");
            }
        }

        result
    }
}

fn report_failure(err: &StrategyError) {
    match err {
        StrategyError::ReconciliationFailed(mismatches) => {
            let report = serde_json::to_string(mismatches)
                .unwrap_or_else(|e| format!("<unserializable report: {e}>"));
            error!(
                mismatches = mismatches.len(),
                report = %report,
                "Preflight reconciliation failed"
            );
        }
        other => error!(error = %other, "Preflight failed"),
    }
}

/// Await a task that may not exist; a missing task never completes.
async fn wait_optional<T>(join: Option<&mut JoinHandle<T>>) -> Result<T, tokio::task::JoinError> {
    match join {
        Some(join) => join.await,
        None => std::future::pending().await,
    }
}

fn flatten<E: Into<AppError>>(
    result: Result<Result<(), E>, tokio::task::JoinError>,
) -> AppResult<()> {
    match result {
        Ok(inner) => inner.map_err(Into::into),
        Err(e) => Err(e.into()),
    }
}
