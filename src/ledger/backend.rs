//! The strategy seam between the ledger store and where data actually lives.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::snapshot::{LedgerMode, LedgerSnapshot};
use crate::domain::{Account, Transaction};
use crate::errors::StoreError;

/// Generation-scoped write handle onto the shared snapshot.
#[derive(Clone)]
pub struct SnapshotCell {
    tx: Arc<watch::Sender<LedgerSnapshot>>,
    generation: u64,
}

impl SnapshotCell {
    pub(crate) fn new(tx: Arc<watch::Sender<LedgerSnapshot>>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn read(&self) -> LedgerSnapshot {
        self.tx.borrow().clone()
    }

    /// Applies `apply` if the snapshot still belongs to this generation.
    /// Returns false (and changes nothing) when the identity has moved on.
    pub fn update<F>(&self, apply: F) -> bool
    where
        F: FnOnce(&mut LedgerSnapshot),
    {
        let generation = self.generation;
        self.tx.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            apply(snapshot);
            true
        })
    }

    /// Like [`update`](Self::update), but reports a stale generation as an error.
    pub fn apply<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut LedgerSnapshot),
    {
        if self.update(apply) {
            Ok(())
        } else {
            Err(StoreError::NoIdentity)
        }
    }
}

/// Background feed tasks; aborted when dropped.
#[derive(Default)]
pub struct FeedGuard {
    handles: Vec<JoinHandle<()>>,
}

impl FeedGuard {
    pub fn new(handles: Vec<JoinHandle<()>>) -> Self {
        Self { handles }
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Reads, writes and subscriptions for one identity's ledger.
///
/// Exactly one backend is active at a time; the store picks it on every
/// identity change.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    fn mode(&self) -> LedgerMode;

    /// Populates `cell` and starts any live feeds. Must run inside a Tokio runtime.
    fn attach(&self, cell: &SnapshotCell) -> Result<FeedGuard, StoreError>;

    async fn add_account(&self, cell: &SnapshotCell, account: &Account) -> Result<(), StoreError>;

    /// Looks an account up by id. The snapshot answers by default.
    async fn find_account(
        &self,
        cell: &SnapshotCell,
        id: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(cell.read().account(id).cloned())
    }

    async fn delete_account(&self, cell: &SnapshotCell, id: &str) -> Result<(), StoreError>;

    /// Records `txn` and, when `balance_delta` is set, adjusts its account's
    /// balance by that amount as part of the same operation.
    ///
    /// A missing account with a delta set fails with
    /// `StoreError::DocumentNotFound` on the accounts collection and writes
    /// nothing.
    async fn add_transaction(
        &self,
        cell: &SnapshotCell,
        txn: &Transaction,
        balance_delta: Option<f64>,
    ) -> Result<(), StoreError>;
}
