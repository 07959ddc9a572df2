//! Ledger Store: accounts and transactions for the current identity.
//!
//! The store owns the snapshot. Callers read clones or subscribe to a watch
//! receiver, and route every mutation through the operations below.

pub mod backend;
pub mod local;
pub mod remote;
pub mod seed;
pub mod snapshot;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::config::{LedgerConfig, UnknownAccountPolicy};
use crate::confirm::Confirmer;
use crate::domain::{Account, Identity, IdentityMode, NewTransaction, Transaction};
use crate::errors::StoreError;
use crate::session::IdentityFeed;
use crate::storage::{DocumentStore, ACCOUNTS};

pub use backend::{FeedGuard, LedgerBackend, SnapshotCell};
pub use local::LocalBackend;
pub use remote::RemoteBackend;
pub use snapshot::{LedgerMode, LedgerSnapshot};

/// Result of a delete request. Declining is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

struct Active {
    identity: Option<Identity>,
    cell: SnapshotCell,
    backend: Option<Arc<dyn LedgerBackend>>,
    // Held for its Drop: aborts the previous identity's feeds.
    _feeds: FeedGuard,
}

pub struct LedgerStore {
    remote: Option<Arc<dyn DocumentStore>>,
    config: LedgerConfig,
    local: Arc<LocalBackend>,
    state: Arc<watch::Sender<LedgerSnapshot>>,
    active: Mutex<Active>,
}

impl LedgerStore {
    /// `remote` is the document store connection; `None` forces local mode
    /// for every identity.
    pub fn new(remote: Option<Arc<dyn DocumentStore>>, config: LedgerConfig) -> Self {
        Self::with_local_backend(remote, config, LocalBackend::new())
    }

    pub fn with_local_backend(
        remote: Option<Arc<dyn DocumentStore>>,
        config: LedgerConfig,
        local: LocalBackend,
    ) -> Self {
        let (tx, _rx) = watch::channel(LedgerSnapshot::default());
        let state = Arc::new(tx);
        let active = Active {
            identity: None,
            cell: SnapshotCell::new(state.clone(), 0),
            backend: None,
            _feeds: FeedGuard::default(),
        };
        Self {
            remote,
            config,
            local: Arc::new(local),
            state,
            active: Mutex::new(active),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Active> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.borrow().clone()
    }

    /// Read-only, change-notified view of the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<LedgerSnapshot> {
        self.state.subscribe()
    }

    pub fn mode(&self) -> LedgerMode {
        self.state.borrow().mode
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Name of the referenced account, or "Unknown account".
    pub fn account_label(&self, id: &str) -> String {
        self.state.borrow().account_name(id).to_string()
    }

    /// Drops the previous identity's feeds, clears the snapshot and attaches
    /// the backend chosen for `identity`. Must run inside a Tokio runtime.
    pub fn switch_identity(&self, identity: Option<Identity>) -> LedgerMode {
        let mut active = self.lock();
        if active.identity == identity {
            return self.state.borrow().mode;
        }

        let generation = active.cell.generation() + 1;
        let backend = self.select_backend(identity.as_ref());
        let mode = backend
            .as_ref()
            .map(|backend| backend.mode())
            .unwrap_or(LedgerMode::Detached);

        // Abort stale feeds before anything of the new identity lands.
        active._feeds = FeedGuard::default();
        let owner = identity.as_ref().map(|identity| identity.uid.clone());
        self.state.send_replace(LedgerSnapshot {
            generation,
            owner,
            mode,
            ..LedgerSnapshot::default()
        });
        let cell = SnapshotCell::new(self.state.clone(), generation);

        let (backend, feeds) = match backend {
            Some(backend) => match backend.attach(&cell) {
                Ok(feeds) => (Some(backend), feeds),
                Err(err) => {
                    tracing::warn!(error = %err, "remote ledger unavailable; using local data");
                    let local: Arc<dyn LedgerBackend> = self.local.clone();
                    cell.update(|snapshot| snapshot.mode = LedgerMode::Local);
                    let feeds = local.attach(&cell).unwrap_or_default();
                    cell.update(|snapshot| snapshot.sync_error = Some(err));
                    (Some(local), feeds)
                }
            },
            None => (None, FeedGuard::default()),
        };

        let mode = self.state.borrow().mode;
        tracing::info!(
            uid = identity.as_ref().map(|identity| identity.uid.as_str()).unwrap_or("-"),
            ?mode,
            generation,
            "ledger switched identity"
        );
        *active = Active {
            identity,
            cell,
            backend,
            _feeds: feeds,
        };
        mode
    }

    fn select_backend(&self, identity: Option<&Identity>) -> Option<Arc<dyn LedgerBackend>> {
        let identity = identity?;
        match (identity.mode, &self.remote) {
            (IdentityMode::Authenticated, Some(store)) => Some(Arc::new(RemoteBackend::new(
                store.clone(),
                identity.uid.clone(),
                self.config.transaction_page_size,
            ))),
            _ => Some(self.local.clone()),
        }
    }

    /// Follows an identity feed, switching on every value it yields.
    /// Must run inside a Tokio runtime.
    pub fn follow(self: &Arc<Self>, mut feed: IdentityFeed) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(identity) = feed.next().await {
                store.switch_identity(identity);
            }
        })
    }

    fn current(&self) -> Result<(SnapshotCell, Arc<dyn LedgerBackend>), StoreError> {
        let active = self.lock();
        let backend = active.backend.clone().ok_or(StoreError::NoIdentity)?;
        Ok((active.cell.clone(), backend))
    }

    /// Creates an account under a fresh identifier. Negative balances are allowed.
    pub async fn add_account(
        &self,
        name: &str,
        initial_balance: f64,
        color: &str,
    ) -> Result<Account, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("account name must not be empty".into()));
        }
        if !initial_balance.is_finite() {
            return Err(StoreError::Validation(format!(
                "initial balance must be a finite number, got {initial_balance}"
            )));
        }
        let (cell, backend) = self.current()?;
        let account = Account::new(name, initial_balance, color);
        backend.add_account(&cell, &account).await?;
        tracing::info!(account = %account.id, mode = ?backend.mode(), "account added");
        Ok(account)
    }

    /// Removes an account after confirmation. Transactions referencing it are kept.
    ///
    /// `confirmer` runs synchronously on the calling task.
    pub async fn delete_account(
        &self,
        id: &str,
        confirmer: &dyn Confirmer,
    ) -> Result<DeleteOutcome, StoreError> {
        let (cell, backend) = self.current()?;
        let name = backend
            .find_account(&cell, id)
            .await?
            .map(|account| account.name)
            .ok_or_else(|| StoreError::AccountNotFound(id.to_string()))?;

        let prompt = format!("Delete account \"{name}\"? Its transactions will be kept.");
        if !confirmer.confirm(&prompt) {
            tracing::debug!(account = id, "account deletion declined");
            return Ok(DeleteOutcome::Declined);
        }
        backend.delete_account(&cell, id).await?;
        tracing::info!(account = id, "account deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Records a transaction and applies the signed amount to its account in
    /// the same operation.
    ///
    /// Whether the account exists is decided by the backend's write, not by
    /// the snapshot, so an account created a moment ago is always found.
    pub async fn add_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        new.validate()?;
        let (cell, backend) = self.current()?;
        let txn = new.into_transaction();

        match backend.add_transaction(&cell, &txn, Some(txn.signed_amount())).await {
            Ok(()) => {}
            Err(StoreError::DocumentNotFound { collection, .. }) if collection == ACCOUNTS => {
                match self.config.unknown_account_policy {
                    UnknownAccountPolicy::Reject => {
                        return Err(StoreError::AccountNotFound(txn.account_id));
                    }
                    UnknownAccountPolicy::RecordOnly => {
                        tracing::warn!(
                            account = %txn.account_id,
                            "recording transaction for unknown account without a balance update"
                        );
                        backend.add_transaction(&cell, &txn, None).await?;
                    }
                }
            }
            Err(err) => return Err(err),
        }
        tracing::info!(
            transaction = %txn.id,
            kind = %txn.kind,
            amount = txn.amount,
            "transaction recorded"
        );
        Ok(txn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionType;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 14).unwrap()
    }

    fn demo_store() -> LedgerStore {
        LedgerStore::with_local_backend(
            None,
            LedgerConfig::default(),
            LocalBackend::with_today(date()),
        )
    }

    #[tokio::test]
    async fn detached_store_rejects_mutations() {
        let store = demo_store();
        assert_eq!(store.mode(), LedgerMode::Detached);
        let err = store.add_account("Cash", 10.0, "bg-blue-500").await.unwrap_err();
        assert_eq!(err, StoreError::NoIdentity);
    }

    #[tokio::test]
    async fn guest_identity_gets_seeded_local_data() {
        let store = demo_store();
        assert_eq!(store.switch_identity(Some(Identity::guest())), LedgerMode::Local);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.accounts.len(), 2);
        assert_eq!(snapshot.transactions.len(), 2);
        assert_eq!(snapshot.owner.as_deref(), Some(crate::domain::GUEST_UID));
    }

    #[tokio::test]
    async fn repeated_identity_does_not_reset_local_edits() {
        let store = demo_store();
        store.switch_identity(Some(Identity::guest()));
        store.add_account("Travel", 0.0, "bg-pink-500").await.unwrap();
        store.switch_identity(Some(Identity::guest()));
        assert_eq!(store.snapshot().accounts.len(), 3);
    }

    #[tokio::test]
    async fn blank_names_and_non_finite_balances_are_rejected() {
        let store = demo_store();
        store.switch_identity(Some(Identity::guest()));
        assert!(matches!(
            store.add_account("   ", 1.0, "bg-blue-500").await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.add_account("Cash", f64::INFINITY, "bg-blue-500").await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.snapshot().accounts.len(), 2);
    }

    #[tokio::test]
    async fn reject_policy_leaves_ledger_untouched() {
        let config = LedgerConfig {
            unknown_account_policy: UnknownAccountPolicy::Reject,
            ..LedgerConfig::default()
        };
        let store =
            LedgerStore::with_local_backend(None, config, LocalBackend::with_today(date()));
        store.switch_identity(Some(Identity::guest()));
        let before = store.snapshot();
        let err = store
            .add_transaction(NewTransaction::new(
                "missing",
                10.0,
                TransactionType::Expense,
                "Food",
                date(),
            ))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::AccountNotFound("missing".into()));
        assert_eq!(store.snapshot(), before);
    }
}
