use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::backend::{FeedGuard, LedgerBackend, SnapshotCell};
use super::snapshot::{LedgerMode, LedgerSnapshot};
use crate::domain::{Account, Transaction};
use crate::errors::StoreError;
use crate::storage::records::{
    decode_account, decode_accounts, decode_transactions, encode_account, encode_transaction,
};
use crate::storage::{
    Direction, Document, DocumentStore, LiveQuery, Query, WriteOp, ACCOUNTS, OWNER_FIELD,
    TRANSACTIONS,
};

/// Mirrors two live queries scoped to one owner and writes through the store.
pub struct RemoteBackend {
    store: Arc<dyn DocumentStore>,
    owner: String,
    page_size: usize,
}

impl RemoteBackend {
    pub fn new(store: Arc<dyn DocumentStore>, owner: impl Into<String>, page_size: usize) -> Self {
        Self {
            store,
            owner: owner.into(),
            page_size,
        }
    }

    pub fn accounts_query(&self) -> Query {
        Query::collection(ACCOUNTS).where_eq(OWNER_FIELD, self.owner.clone())
    }

    pub fn transactions_query(&self) -> Query {
        Query::collection(TRANSACTIONS)
            .where_eq(OWNER_FIELD, self.owner.clone())
            .order_by("date", Direction::Descending)
            .limit(self.page_size)
    }
}

/// Replaces one collection of the snapshot on every delivery until the feed
/// closes or the identity moves on.
fn spawn_feed<T, D, S>(
    mut feed: LiveQuery,
    cell: SnapshotCell,
    collection: &'static str,
    decode: D,
    store_into: S,
) -> JoinHandle<()>
where
    T: Send + 'static,
    D: Fn(&[Document]) -> Result<Vec<T>, StoreError> + Send + 'static,
    S: Fn(&mut LedgerSnapshot, Vec<T>) + Send + 'static,
{
    tokio::spawn(async move {
        // The error this feed last reported; a good delivery clears only that.
        let mut reported: Option<StoreError> = None;
        loop {
            let delivery = feed.next().await;
            let still_current = match delivery {
                Some(Ok(docs)) => match decode(&docs) {
                    Ok(items) => {
                        tracing::debug!(collection, count = items.len(), "live query delivery");
                        let recovered = reported.take();
                        cell.update(|snapshot| {
                            store_into(snapshot, items);
                            if recovered.is_some() && snapshot.sync_error == recovered {
                                snapshot.sync_error = None;
                            }
                        })
                    }
                    Err(err) => {
                        tracing::error!(collection, error = %err, "discarding undecodable delivery");
                        report(&cell, &mut reported, err)
                    }
                },
                Some(Err(err)) => {
                    tracing::error!(collection, error = %err, "live query failed");
                    report(&cell, &mut reported, err)
                }
                None => {
                    tracing::warn!(collection, "live query closed by the store");
                    report(&cell, &mut reported, StoreError::FeedClosed);
                    break;
                }
            };
            if !still_current {
                break;
            }
        }
    })
}

fn report(cell: &SnapshotCell, reported: &mut Option<StoreError>, err: StoreError) -> bool {
    *reported = Some(err.clone());
    cell.update(|snapshot| snapshot.sync_error = Some(err))
}

#[async_trait]
impl LedgerBackend for RemoteBackend {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Remote
    }

    fn attach(&self, cell: &SnapshotCell) -> Result<FeedGuard, StoreError> {
        let accounts = self.store.watch(self.accounts_query())?;
        let transactions = self.store.watch(self.transactions_query())?;
        let handles = vec![
            spawn_feed(
                accounts,
                cell.clone(),
                ACCOUNTS,
                decode_accounts,
                |snapshot, items| snapshot.accounts = items,
            ),
            spawn_feed(
                transactions,
                cell.clone(),
                TRANSACTIONS,
                decode_transactions,
                |snapshot, items| snapshot.transactions = items,
            ),
        ];
        Ok(FeedGuard::new(handles))
    }

    /// Commits the insert, then shows the account locally until the next
    /// accounts delivery replaces it.
    async fn add_account(&self, cell: &SnapshotCell, account: &Account) -> Result<(), StoreError> {
        self.store
            .commit(vec![WriteOp::Insert {
                collection: ACCOUNTS.into(),
                id: account.id.clone(),
                fields: encode_account(account, &self.owner),
            }])
            .await?;
        cell.update(|snapshot| {
            if snapshot.account(&account.id).is_none() {
                snapshot.accounts.push(account.clone());
            }
        });
        Ok(())
    }

    /// Falls back to the store when the feed has not delivered the account yet.
    async fn find_account(
        &self,
        cell: &SnapshotCell,
        id: &str,
    ) -> Result<Option<Account>, StoreError> {
        if let Some(account) = cell.read().account(id) {
            return Ok(Some(account.clone()));
        }
        let owner = Value::from(self.owner.as_str());
        match self.store.get(ACCOUNTS, id).await? {
            Some(doc) if doc.fields.get(OWNER_FIELD) == Some(&owner) => {
                decode_account(&doc).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn delete_account(&self, cell: &SnapshotCell, id: &str) -> Result<(), StoreError> {
        self.store.delete(ACCOUNTS, id).await?;
        cell.update(|snapshot| snapshot.accounts.retain(|account| account.id != id));
        Ok(())
    }

    async fn add_transaction(
        &self,
        _cell: &SnapshotCell,
        txn: &Transaction,
        balance_delta: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut writes = vec![WriteOp::Insert {
            collection: TRANSACTIONS.into(),
            id: txn.id.clone(),
            fields: encode_transaction(txn, &self.owner),
        }];
        if let Some(delta) = balance_delta {
            writes.push(WriteOp::Increment {
                collection: ACCOUNTS.into(),
                id: txn.account_id.clone(),
                field: "balance".into(),
                by: delta,
            });
        }
        self.store.commit(writes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDocumentStore;

    #[test]
    fn queries_are_scoped_to_the_owner() {
        let backend = RemoteBackend::new(Arc::new(InMemoryDocumentStore::new()), "u1", 50);
        let accounts = backend.accounts_query();
        assert_eq!(accounts.collection, ACCOUNTS);
        assert_eq!(accounts.filters, vec![(OWNER_FIELD.to_string(), Value::from("u1"))]);
        assert_eq!(accounts.limit, None);

        let transactions = backend.transactions_query();
        assert_eq!(
            transactions.order_by,
            Some(("date".to_string(), Direction::Descending))
        );
        assert_eq!(transactions.limit, Some(50));
    }
}
