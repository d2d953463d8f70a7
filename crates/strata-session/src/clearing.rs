//! Intermediate clearing process.
//!
//! The clearing state machine is total over its alphabet: every
//! [`IntClearingState`] event moves the process to that state, from any
//! state, including Completed. Self-transitions are observed but change
//! nothing.

use strata_core::{IntClearingState, SessionId, Transition};
use strata_telemetry::Metrics;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};

// ============================================================================
// ClearingMachine
// ============================================================================

/// Pure clearing state machine.
#[derive(Debug, Clone)]
pub struct ClearingMachine {
    session_id: SessionId,
    state: IntClearingState,
}

impl ClearingMachine {
    pub fn new(session_id: SessionId, initial: IntClearingState) -> Self {
        Self {
            session_id,
            state: initial,
        }
    }

    pub fn state(&self) -> IntClearingState {
        self.state
    }

    /// Move to `event` unconditionally and report the transition.
    pub fn apply(&mut self, event: IntClearingState) -> Transition<IntClearingState> {
        let transition = Transition::new(self.state, event);
        self.state = event;

        if transition.is_change() {
            info!(
                session_id = %self.session_id,
                from = %transition.from,
                to = %transition.to,
                "Clearing state transition"
            );
        } else {
            debug!(
                session_id = %self.session_id,
                state = %transition.to,
                "Clearing state unchanged"
            );
        }
        Metrics::clearing_transition(transition.from.as_str(), transition.to.as_str());

        transition
    }
}

// ============================================================================
// ClearingMsg / ClearingTask
// ============================================================================

/// Messages for the clearing process.
#[derive(Debug)]
pub enum ClearingMsg {
    /// Clearing state reported by the exchange.
    State(IntClearingState),
    /// Graceful shutdown.
    Shutdown,
}

struct ClearingTask {
    rx: mpsc::Receiver<ClearingMsg>,
    machine: ClearingMachine,
    state_tx: watch::Sender<IntClearingState>,
}

impl ClearingTask {
    async fn run(mut self) {
        debug!(session_id = %self.machine.session_id, "ClearingTask started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                ClearingMsg::State(event) => {
                    let transition = self.machine.apply(event);
                    self.state_tx.send_replace(transition.to);
                }
                ClearingMsg::Shutdown => break,
            }
        }

        debug!(session_id = %self.machine.session_id, "ClearingTask terminated");
    }
}

// ============================================================================
// ClearingHandle
// ============================================================================

/// Handle for the clearing process.
#[derive(Clone)]
pub struct ClearingHandle {
    tx: mpsc::Sender<ClearingMsg>,
    state_rx: watch::Receiver<IntClearingState>,
}

impl ClearingHandle {
    /// Deliver a clearing state event.
    pub async fn update(&self, state: IntClearingState) -> SessionResult<()> {
        self.tx
            .send(ClearingMsg::State(state))
            .await
            .map_err(|_| SessionError::ChannelClosed("clearing".to_string()))
    }

    /// Last state the process accepted.
    pub fn state(&self) -> IntClearingState {
        *self.state_rx.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<IntClearingState> {
        self.state_rx.clone()
    }

    /// Ask the process to stop after draining queued events.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ClearingMsg::Shutdown).await;
    }
}

/// Spawn a clearing process starting in `initial`.
pub fn spawn_clearing_process(
    session_id: SessionId,
    initial: IntClearingState,
    capacity: usize,
) -> (ClearingHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let (state_tx, state_rx) = watch::channel(initial);

    let task = ClearingTask {
        rx,
        machine: ClearingMachine::new(session_id, initial),
        state_tx,
    };
    let join_handle = tokio::spawn(task.run());

    (ClearingHandle { tx, state_rx }, join_handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::new(4021)
    }

    #[test]
    fn test_machine_accepts_every_event_from_every_state() {
        for from in IntClearingState::ALL {
            for to in IntClearingState::ALL {
                let mut machine = ClearingMachine::new(session(), from);
                let transition = machine.apply(to);
                assert_eq!(transition, Transition::new(from, to));
                assert_eq!(machine.state(), to);
            }
        }
    }

    #[test]
    fn test_machine_state_tracks_last_event() {
        let mut machine = ClearingMachine::new(session(), IntClearingState::Undefined);
        let events = [
            IntClearingState::Oncoming,
            IntClearingState::Running,
            IntClearingState::Running,
            IntClearingState::Finalizing,
            IntClearingState::Completed,
            IntClearingState::Oncoming,
        ];
        for event in events {
            machine.apply(event);
            assert_eq!(machine.state(), event);
        }
    }

    #[test]
    fn test_self_transition_is_not_a_change() {
        let mut machine = ClearingMachine::new(session(), IntClearingState::Running);
        let transition = machine.apply(IntClearingState::Running);
        assert!(!transition.is_change());
        assert_eq!(machine.state(), IntClearingState::Running);
    }

    #[tokio::test]
    async fn test_process_publishes_last_event() {
        let (handle, join) = spawn_clearing_process(session(), IntClearingState::Undefined, 8);
        assert_eq!(handle.state(), IntClearingState::Undefined);

        handle.update(IntClearingState::Oncoming).await.unwrap();
        handle.update(IntClearingState::Running).await.unwrap();
        handle.update(IntClearingState::Completed).await.unwrap();
        handle.shutdown().await;
        join.await.unwrap();

        assert_eq!(handle.state(), IntClearingState::Completed);
    }

    #[tokio::test]
    async fn test_update_after_stop_fails() {
        let (handle, join) = spawn_clearing_process(session(), IntClearingState::Undefined, 8);
        handle.shutdown().await;
        join.await.unwrap();

        let result = handle.update(IntClearingState::Running).await;
        tokio_test::assert_err!(result);
    }
}
