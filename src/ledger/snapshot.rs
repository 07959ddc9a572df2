use crate::domain::{find_by_id, Account, Transaction, UNKNOWN_ACCOUNT};
use crate::errors::StoreError;

/// Which backend currently feeds the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerMode {
    /// No identity: empty snapshot, mutations rejected.
    #[default]
    Detached,
    /// Seeded in-memory collections, no remote calls.
    Local,
    /// Mirrors live queries against the document store.
    Remote,
}

/// Read-only view of the ledger for the current identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    /// Increments on every identity switch; writes tagged with an older
    /// generation are discarded.
    pub generation: u64,
    pub owner: Option<String>,
    pub mode: LedgerMode,
    pub accounts: Vec<Account>,
    /// Date descending.
    pub transactions: Vec<Transaction>,
    /// Last live-feed failure; cleared by the next good delivery.
    pub sync_error: Option<StoreError>,
}

impl LedgerSnapshot {
    pub fn account(&self, id: &str) -> Option<&Account> {
        find_by_id(&self.accounts, id)
    }

    /// The account's name, or "Unknown account" for dangling references.
    pub fn account_name(&self, id: &str) -> &str {
        self.account(id)
            .map(|account| account.name.as_str())
            .unwrap_or(UNKNOWN_ACCOUNT)
    }

    pub fn total_balance(&self) -> f64 {
        self.accounts.iter().map(|account| account.balance).sum()
    }

    /// Transactions whose account reference no longer resolves.
    pub fn orphaned_transactions(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|txn| self.account(&txn.account_id).is_none())
            .collect()
    }
}
