//! Session process.
//!
//! Owns one clearing process and one contract repository per configured
//! instrument kind. Handles three event shapes:
//!
//! - session state: accepted while Assigned, Online or Suspended; moves the
//!   session to the reported state
//! - clearing state: accepted in every state, forwarded unchanged to the
//!   clearing process
//! - contract snapshot: accepted in every state, split by instrument kind
//!   and forwarded to the matching repository
//!
//! Once Canceled or Completed, a session-state event naming any other state
//! stops the process with [`SessionError::ProtocolViolation`]. A finished
//! session is never resurrected by a stray event. Children are stopped
//! whenever the session stops, on error or on shutdown.

use std::sync::Arc;

use strata_core::{
    ContractSnapshot, InstrumentKind, IntClearingState, SessionContent, SessionId, SessionRecord,
    SessionState, Transition,
};
use strata_telemetry::Metrics;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::clearing::{spawn_clearing_process, ClearingHandle};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::repository::{spawn_contract_repository, ContractRepositoryHandle};

// ============================================================================
// SessionMachine
// ============================================================================

/// Pure session state machine.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    session_id: SessionId,
    state: SessionState,
}

impl SessionMachine {
    pub fn new(session_id: SessionId, initial: SessionState) -> Self {
        Self {
            session_id,
            state: initial,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Apply a session-state event.
    ///
    /// In a terminal state only the same-state event is accepted, as a no-op.
    pub fn apply(&mut self, event: SessionState) -> SessionResult<Transition<SessionState>> {
        if self.state.is_terminal() && event != self.state {
            error!(
                session_id = %self.session_id,
                state = %self.state,
                event = %event,
                "Session-state event in terminal state"
            );
            Metrics::protocol_violation(self.state.as_str(), event.as_str());
            return Err(SessionError::ProtocolViolation {
                session_id: self.session_id,
                state: self.state,
                event,
            });
        }

        let transition = Transition::new(self.state, event);
        self.state = event;

        if transition.is_change() {
            info!(
                session_id = %self.session_id,
                from = %transition.from,
                to = %transition.to,
                "Session state transition"
            );
        } else {
            debug!(
                session_id = %self.session_id,
                state = %transition.to,
                "Session state unchanged"
            );
        }
        Metrics::session_transition(transition.from.as_str(), transition.to.as_str());

        Ok(transition)
    }
}

// ============================================================================
// SessionEvent / SessionMsg
// ============================================================================

/// Events delivered to a session by the protocol decoder.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    State(SessionState),
    Clearing(IntClearingState),
    Contents(ContractSnapshot),
}

/// Messages for the session process.
#[derive(Debug)]
pub enum SessionMsg {
    Event(SessionEvent),
    /// Graceful shutdown; children are stopped first.
    Shutdown,
}

// ============================================================================
// SessionTask
// ============================================================================

struct SessionTask {
    rx: mpsc::Receiver<SessionMsg>,
    content: Arc<SessionContent>,
    machine: SessionMachine,
    state_tx: watch::Sender<SessionState>,
    clearing: ClearingHandle,
    clearing_join: JoinHandle<()>,
    repositories: Vec<(ContractRepositoryHandle, JoinHandle<()>)>,
}

impl SessionTask {
    /// Run until shutdown, handle drop, or a protocol violation.
    async fn run(mut self) -> SessionResult<()> {
        debug!(session_id = %self.content.id, "SessionTask started");

        let result = match self.assign_repositories().await {
            Ok(()) => self.process_messages().await,
            Err(e) => Err(e),
        };

        self.stop_children().await;

        match &result {
            Ok(()) => debug!(session_id = %self.content.id, "SessionTask terminated"),
            Err(e) => error!(session_id = %self.content.id, error = %e, "SessionTask stopped"),
        }
        result
    }

    async fn assign_repositories(&self) -> SessionResult<()> {
        for (repository, _) in &self.repositories {
            repository.assign_session(self.content.id).await?;
        }
        Ok(())
    }

    async fn process_messages(&mut self) -> SessionResult<()> {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                SessionMsg::Event(event) => self.handle_event(event).await?,
                SessionMsg::Shutdown => break,
            }
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: SessionEvent) -> SessionResult<()> {
        match event {
            SessionEvent::State(state) => {
                let transition = self.machine.apply(state)?;
                self.state_tx.send_replace(transition.to);
            }
            SessionEvent::Clearing(state) => {
                self.clearing.update(state).await?;
            }
            SessionEvent::Contents(snapshot) => {
                for (repository, _) in &self.repositories {
                    let contracts = snapshot.of_kind(repository.kind());
                    debug!(
                        session_id = %self.content.id,
                        kind = %repository.kind(),
                        count = contracts.len(),
                        "Forwarding contract snapshot"
                    );
                    repository.snapshot(contracts).await?;
                }
            }
        }
        Ok(())
    }

    /// Stop children in creation order and wait for them to drain.
    async fn stop_children(&mut self) {
        self.clearing.shutdown().await;
        if let Err(e) = (&mut self.clearing_join).await {
            error!(session_id = %self.content.id, error = %e, "Clearing process panicked");
        }

        for (repository, join) in self.repositories.iter_mut() {
            repository.shutdown().await;
            if let Err(e) = join.await {
                error!(
                    session_id = %self.content.id,
                    kind = %repository.kind(),
                    error = %e,
                    "Contract repository panicked"
                );
            }
        }
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Handle for a session process.
///
/// Child handles are exposed for reading only; events reach the children
/// through the session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionMsg>,
    content: Arc<SessionContent>,
    state_rx: watch::Receiver<SessionState>,
    clearing: ClearingHandle,
    repositories: Vec<ContractRepositoryHandle>,
}

impl SessionHandle {
    pub fn content(&self) -> &SessionContent {
        &self.content
    }

    pub fn id(&self) -> SessionId {
        self.content.id
    }

    /// Last session state the process accepted.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn clearing(&self) -> &ClearingHandle {
        &self.clearing
    }

    pub fn repository(&self, kind: InstrumentKind) -> Option<&ContractRepositoryHandle> {
        self.repositories.iter().find(|r| r.kind() == kind)
    }

    pub async fn send(&self, event: SessionEvent) -> SessionResult<()> {
        self.tx
            .send(SessionMsg::Event(event))
            .await
            .map_err(|_| SessionError::ChannelClosed(format!("session {}", self.content.id)))
    }

    pub async fn update_state(&self, state: SessionState) -> SessionResult<()> {
        self.send(SessionEvent::State(state)).await
    }

    pub async fn update_clearing(&self, state: IntClearingState) -> SessionResult<()> {
        self.send(SessionEvent::Clearing(state)).await
    }

    pub async fn update_contents(&self, snapshot: ContractSnapshot) -> SessionResult<()> {
        self.send(SessionEvent::Contents(snapshot)).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionMsg::Shutdown).await;
    }
}

/// Spawn a session process together with its children.
pub fn spawn_session_process(
    content: SessionContent,
    state: SessionState,
    clearing_state: IntClearingState,
    config: &SessionConfig,
) -> SessionResult<(SessionHandle, JoinHandle<SessionResult<()>>)> {
    config.validate()?;

    let capacity = config.channel_capacity;
    let content = Arc::new(content);

    let (clearing, clearing_join) = spawn_clearing_process(content.id, clearing_state, capacity);
    let repositories: Vec<(ContractRepositoryHandle, JoinHandle<()>)> = config
        .repository_kinds
        .iter()
        .map(|kind| spawn_contract_repository(*kind, capacity))
        .collect();

    let (tx, rx) = mpsc::channel(capacity);
    let (state_tx, state_rx) = watch::channel(state);

    let handle = SessionHandle {
        tx,
        content: content.clone(),
        state_rx,
        clearing: clearing.clone(),
        repositories: repositories.iter().map(|(r, _)| r.clone()).collect(),
    };

    info!(
        session_id = %content.id,
        state = %state,
        clearing_state = %clearing_state,
        repositories = repositories.len(),
        "Session process starting"
    );

    let task = SessionTask {
        rx,
        content,
        machine: SessionMachine::new(handle.id(), state),
        state_tx,
        clearing,
        clearing_join,
        repositories,
    };
    let join_handle = tokio::spawn(task.run());

    Ok((handle, join_handle))
}

/// Decode an exchange session record and spawn its process tree.
pub fn spawn_session_from_record(
    record: &SessionRecord,
    config: &SessionConfig,
) -> SessionResult<(SessionHandle, JoinHandle<SessionResult<()>>)> {
    let content = SessionContent::from_record(record)?;
    let state = record.session_state()?;
    let clearing_state = record.clearing_state()?;
    spawn_session_process(content, state, clearing_state, config)
}
