//! Exchange session lifecycle processes.
//!
//! A session is tracked by a small tree of single-threaded actors:
//!
//! - session process ([`session`]): follows session-state events, forwards
//!   clearing events and instrument snapshots to its children
//! - clearing process ([`clearing`]): follows intermediate-clearing events
//! - contract repository ([`repository`]): keeps the contracts of one
//!   instrument kind listed for the owning session
//!
//! Children are spawned with their session and stopped when it stops.
//! Each process exposes a cloneable handle; state is published on a
//! `watch` channel so readers never wait on the actor.
//!
//! # Key Components
//!
//! - [`SessionMachine`], [`ClearingMachine`]: pure transition functions
//! - [`spawn_session_process`]: builds the whole tree from a decoded session
//! - [`SessionHandle`]: sends [`SessionEvent`]s and reads current state

pub mod clearing;
pub mod config;
pub mod error;
pub mod repository;
pub mod session;

pub use clearing::{spawn_clearing_process, ClearingHandle, ClearingMachine, ClearingMsg};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use repository::{spawn_contract_repository, ContractRepositoryHandle, ContractRepositoryMsg};
pub use session::{
    spawn_session_from_record, spawn_session_process, SessionEvent, SessionHandle,
    SessionMachine, SessionMsg,
};
