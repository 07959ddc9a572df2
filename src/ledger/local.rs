use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use super::backend::{FeedGuard, LedgerBackend, SnapshotCell};
use super::seed::{seed_accounts, seed_transactions};
use super::snapshot::LedgerMode;
use crate::domain::{Account, Transaction};
use crate::errors::StoreError;
use crate::storage::ACCOUNTS;

/// In-memory collections populated from the seed dataset.
pub struct LocalBackend {
    today: NaiveDate,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Seeds transactions dated `today` instead of the system date.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerBackend for LocalBackend {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Local
    }

    fn attach(&self, cell: &SnapshotCell) -> Result<FeedGuard, StoreError> {
        let today = self.today;
        cell.apply(|snapshot| {
            snapshot.accounts = seed_accounts();
            snapshot.transactions = seed_transactions(today);
            snapshot.sync_error = None;
        })?;
        Ok(FeedGuard::default())
    }

    async fn add_account(&self, cell: &SnapshotCell, account: &Account) -> Result<(), StoreError> {
        let account = account.clone();
        cell.apply(|snapshot| snapshot.accounts.push(account))
    }

    async fn delete_account(&self, cell: &SnapshotCell, id: &str) -> Result<(), StoreError> {
        cell.apply(|snapshot| snapshot.accounts.retain(|account| account.id != id))
    }

    async fn add_transaction(
        &self,
        cell: &SnapshotCell,
        txn: &Transaction,
        balance_delta: Option<f64>,
    ) -> Result<(), StoreError> {
        if balance_delta.is_some() && cell.read().account(&txn.account_id).is_none() {
            return Err(StoreError::DocumentNotFound {
                collection: ACCOUNTS.to_string(),
                id: txn.account_id.clone(),
            });
        }
        let txn = txn.clone();
        cell.apply(|snapshot| {
            if let Some(delta) = balance_delta {
                if let Some(account) = snapshot
                    .accounts
                    .iter_mut()
                    .find(|account| account.id == txn.account_id)
                {
                    account.balance += delta;
                }
            }
            snapshot.transactions.insert(0, txn);
            // Stable sort keeps the newest insert ahead of same-day entries.
            snapshot.transactions.sort_by(|a, b| b.date.cmp(&a.date));
        })
    }
}
