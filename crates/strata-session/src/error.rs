//! Session error types.

use strata_core::{CoreError, SessionId, SessionState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// A session-state event arrived after the session finished.
    #[error("Session {session_id} is {state}, rejected session-state event {event}")]
    ProtocolViolation {
        session_id: SessionId,
        state: SessionState,
        event: SessionState,
    },

    #[error("Process stopped: {0}")]
    ChannelClosed(String),

    #[error("Invalid session record: {0}")]
    Core(#[from] CoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
