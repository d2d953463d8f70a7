//! Contract repository process.
//!
//! One repository per instrument kind, owned by a session. The session
//! tells the repository which session it belongs to, then forwards
//! snapshots; the repository keeps only the contracts listed for its owner.
//!
//! The actor holds the authoritative table. The handle shares a `DashMap`
//! cache updated by the actor after every snapshot, so readers get
//! synchronous lookups without a channel round-trip. The cache is not
//! swapped atomically: `contracts()` and `len()` racing a snapshot may
//! briefly observe entries from both the old and the new one.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use strata_core::{Contract, InstrumentKind, Isin, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{SessionError, SessionResult};

/// Messages for the contract repository.
#[derive(Debug)]
pub enum ContractRepositoryMsg {
    /// Bind the repository to its owning session.
    AssignSession(SessionId),
    /// Contracts of this repository's kind, pre-filtered by the session.
    Snapshot(Vec<Contract>),
    /// Graceful shutdown.
    Shutdown,
}

struct ContractRepositoryTask {
    rx: mpsc::Receiver<ContractRepositoryMsg>,
    kind: InstrumentKind,
    owner: Option<SessionId>,
    contracts: HashMap<Isin, Contract>,
    cache: Arc<DashMap<Isin, Contract>>,
}

impl ContractRepositoryTask {
    async fn run(mut self) {
        debug!(kind = %self.kind, "ContractRepositoryTask started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                ContractRepositoryMsg::AssignSession(session_id) => {
                    debug!(kind = %self.kind, session_id = %session_id, "Repository assigned");
                    self.owner = Some(session_id);
                }
                ContractRepositoryMsg::Snapshot(contracts) => self.on_snapshot(contracts),
                ContractRepositoryMsg::Shutdown => break,
            }
        }

        debug!(kind = %self.kind, "ContractRepositoryTask terminated");
    }

    /// Replace the table with the owner's contracts from `contracts`.
    ///
    /// New entries are written to the cache before stale ones are removed,
    /// so a contract present in both snapshots is never missing. Handle
    /// reads during the update may see old and new contracts mixed.
    fn on_snapshot(&mut self, contracts: Vec<Contract>) {
        let Some(owner) = self.owner else {
            warn!(
                kind = %self.kind,
                count = contracts.len(),
                "Snapshot before session assignment, dropped"
            );
            return;
        };

        let received = contracts.len();
        let kind = self.kind;
        let next: HashMap<Isin, Contract> = contracts
            .into_iter()
            .filter(|c| c.kind == kind && c.session_id == owner)
            .map(|c| (c.isin.clone(), c))
            .collect();

        for (isin, contract) in &next {
            self.cache.insert(isin.clone(), contract.clone());
        }
        self.cache.retain(|isin, _| next.contains_key(isin));

        debug!(
            kind = %self.kind,
            session_id = %owner,
            received,
            kept = next.len(),
            replaced = self.contracts.len(),
            "Contract snapshot applied"
        );
        self.contracts = next;
    }
}

/// Handle for a contract repository.
#[derive(Clone)]
pub struct ContractRepositoryHandle {
    tx: mpsc::Sender<ContractRepositoryMsg>,
    kind: InstrumentKind,
    cache: Arc<DashMap<Isin, Contract>>,
}

impl ContractRepositoryHandle {
    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub async fn assign_session(&self, session_id: SessionId) -> SessionResult<()> {
        self.send(ContractRepositoryMsg::AssignSession(session_id))
            .await
    }

    pub async fn snapshot(&self, contracts: Vec<Contract>) -> SessionResult<()> {
        self.send(ContractRepositoryMsg::Snapshot(contracts)).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(ContractRepositoryMsg::Shutdown).await;
    }

    pub fn get(&self, isin: &Isin) -> Option<Contract> {
        self.cache.get(isin).map(|entry| entry.value().clone())
    }

    /// All stored contracts, ordered by isin.
    pub fn contracts(&self) -> Vec<Contract> {
        let mut contracts: Vec<Contract> =
            self.cache.iter().map(|entry| entry.value().clone()).collect();
        contracts.sort_by(|a, b| a.isin.cmp(&b.isin));
        contracts
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    async fn send(&self, msg: ContractRepositoryMsg) -> SessionResult<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| SessionError::ChannelClosed(format!("{} repository", self.kind)))
    }
}

/// Spawn an unassigned repository for `kind`.
pub fn spawn_contract_repository(
    kind: InstrumentKind,
    capacity: usize,
) -> (ContractRepositoryHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let cache = Arc::new(DashMap::new());

    let task = ContractRepositoryTask {
        rx,
        kind,
        owner: None,
        contracts: HashMap::new(),
        cache: cache.clone(),
    };
    let join_handle = tokio::spawn(task.run());

    (ContractRepositoryHandle { tx, kind, cache }, join_handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(isin: &str, kind: InstrumentKind, session: i32) -> Contract {
        Contract::new(Isin::new(isin).unwrap(), kind, SessionId::new(session), isin)
    }

    fn isin(s: &str) -> Isin {
        Isin::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_keeps_owner_contracts_only() {
        let (handle, join) = spawn_contract_repository(InstrumentKind::Future, 8);

        handle.assign_session(SessionId::new(7)).await.unwrap();
        handle
            .snapshot(vec![
                contract("RIH5", InstrumentKind::Future, 7),
                contract("SiH5", InstrumentKind::Future, 8),
                contract("RI100000BC5", InstrumentKind::Option, 7),
            ])
            .await
            .unwrap();
        handle.shutdown().await;
        join.await.unwrap();

        assert_eq!(handle.len(), 1);
        assert!(handle.get(&isin("RIH5")).is_some());
        assert!(handle.get(&isin("SiH5")).is_none());
        assert!(handle.get(&isin("RI100000BC5")).is_none());
    }

    #[tokio::test]
    async fn test_snapshot_replaces_previous_table() {
        let (handle, join) = spawn_contract_repository(InstrumentKind::Future, 8);

        handle.assign_session(SessionId::new(7)).await.unwrap();
        handle
            .snapshot(vec![
                contract("RIH5", InstrumentKind::Future, 7),
                contract("SiH5", InstrumentKind::Future, 7),
            ])
            .await
            .unwrap();
        handle
            .snapshot(vec![
                contract("SiH5", InstrumentKind::Future, 7),
                contract("BRK5", InstrumentKind::Future, 7),
            ])
            .await
            .unwrap();
        handle.shutdown().await;
        join.await.unwrap();

        let isins: Vec<String> = handle
            .contracts()
            .into_iter()
            .map(|c| c.isin.to_string())
            .collect();
        assert_eq!(isins, vec!["BRK5", "SiH5"]);
    }

    #[tokio::test]
    async fn test_snapshot_before_assignment_is_dropped() {
        let (handle, join) = spawn_contract_repository(InstrumentKind::Future, 8);

        handle
            .snapshot(vec![contract("RIH5", InstrumentKind::Future, 7)])
            .await
            .unwrap();
        handle.shutdown().await;
        join.await.unwrap();

        assert!(handle.is_empty());
    }
}
