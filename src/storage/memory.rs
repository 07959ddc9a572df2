//! Reactive in-process document store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Document, DocumentStore, Fields, LiveQuery, Query, QueryUpdate, WriteOp};
use crate::errors::StoreError;

type Collection = BTreeMap<String, Fields>;

struct Watcher {
    query: Query,
    tx: mpsc::UnboundedSender<QueryUpdate>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    watchers: Vec<Watcher>,
    write_failure: Option<String>,
}

/// Keeps collections in memory and pushes full result sets to live queries
/// after every committed batch.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every following commit fail with `StoreError::Write(message)`.
    /// `None` restores normal operation.
    pub fn fail_writes(&self, message: Option<&str>) {
        self.lock().write_failure = message.map(str::to_string);
    }

    /// Delivers `error` to every live query on `collection`.
    pub fn push_error(&self, collection: &str, error: StoreError) {
        let mut inner = self.lock();
        inner.watchers.retain(|watcher| {
            if watcher.query.collection != collection {
                return !watcher.tx.is_closed();
            }
            watcher.tx.send(Err(error.clone())).is_ok()
        });
    }

    /// Writes a raw document, bypassing validation, and notifies watchers.
    /// Useful for simulating records written by other clients.
    pub fn put_raw(&self, collection: &str, id: &str, fields: Fields) {
        let mut inner = self.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        let touched: HashSet<String> = [collection.to_string()].into_iter().collect();
        notify(&mut inner, &touched);
    }

    /// All documents currently stored in `collection`, ordered by identifier.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        let inner = self.lock();
        inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Fields> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Number of live queries whose receiver is still alive.
    pub fn active_watchers(&self) -> usize {
        let mut inner = self.lock();
        inner.watchers.retain(|watcher| !watcher.tx.is_closed());
        inner.watchers.len()
    }
}

fn apply(collections: &mut HashMap<String, Collection>, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Insert {
            collection,
            id,
            fields,
        } => {
            let docs = collections.entry(collection.clone()).or_default();
            if docs.contains_key(&id) {
                return Err(StoreError::Write(format!(
                    "document {collection}/{id} already exists"
                )));
            }
            docs.insert(id, fields);
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let existing = existing_mut(collections, &collection, &id)?;
            existing.extend(fields);
        }
        WriteOp::Increment {
            collection,
            id,
            field,
            by,
        } => {
            let existing = existing_mut(collections, &collection, &id)?;
            let current = match existing.get(&field) {
                None | Some(Value::Null) => 0.0,
                Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
                Some(other) => {
                    return Err(StoreError::Write(format!(
                        "cannot increment non-numeric field `{field}` ({other})"
                    )))
                }
            };
            existing.insert(field, Value::from(current + by));
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = collections.get_mut(&collection) {
                docs.remove(&id);
            }
        }
    }
    Ok(())
}

fn existing_mut<'a>(
    collections: &'a mut HashMap<String, Collection>,
    collection: &str,
    id: &str,
) -> Result<&'a mut Fields, StoreError> {
    collections
        .get_mut(collection)
        .and_then(|docs| docs.get_mut(id))
        .ok_or_else(|| StoreError::DocumentNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
}

fn evaluate(inner: &Inner, query: &Query) -> Vec<Document> {
    match inner.collections.get(&query.collection) {
        Some(docs) => query.evaluate(docs),
        None => Vec::new(),
    }
}

fn notify(inner: &mut Inner, touched: &HashSet<String>) {
    let watchers = std::mem::take(&mut inner.watchers);
    let mut alive = Vec::with_capacity(watchers.len());
    for watcher in watchers {
        if touched.contains(&watcher.query.collection) {
            let result = evaluate(inner, &watcher.query);
            if watcher.tx.send(Ok(result)).is_err() {
                continue;
            }
        } else if watcher.tx.is_closed() {
            continue;
        }
        alive.push(watcher);
    }
    inner.watchers = alive;
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn watch(&self, query: Query) -> Result<LiveQuery, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let initial = evaluate(&inner, &query);
        // The receiver is alive here, so the initial send cannot fail.
        let _ = tx.send(Ok(initial));
        inner.watchers.push(Watcher { query, tx });
        Ok(LiveQuery::new(rx))
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(message) = inner.write_failure.clone() {
            return Err(StoreError::Write(message));
        }
        let touched: HashSet<String> = writes
            .iter()
            .map(|op| op.collection().to_string())
            .collect();
        let mut staged = inner.collections.clone();
        for op in writes {
            apply(&mut staged, op)?;
        }
        inner.collections = staged;
        notify(&mut inner, &touched);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.document(collection, id).map(|fields| Document {
            id: id.to_string(),
            fields,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Direction, OWNER_FIELD};
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[tokio::test]
    async fn watch_delivers_initial_and_subsequent_results() {
        let store = InMemoryDocumentStore::new();
        let mut feed = store
            .watch(Query::collection("accounts").where_eq(OWNER_FIELD, "u1"))
            .unwrap();
        assert_eq!(feed.next().await.unwrap().unwrap().len(), 0);

        store
            .insert("accounts", fields(json!({"userId": "u1", "name": "Cash"})))
            .await
            .unwrap();
        store
            .insert("accounts", fields(json!({"userId": "u2", "name": "Other"})))
            .await
            .unwrap();

        let first = feed.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        let second = feed.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 1, "u2 records never match the u1 query");
    }

    #[tokio::test]
    async fn failed_batch_applies_nothing() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert("accounts", fields(json!({"balance": 10.0})))
            .await
            .unwrap();
        let err = store
            .commit(vec![
                WriteOp::Increment {
                    collection: "accounts".into(),
                    id: id.clone(),
                    field: "balance".into(),
                    by: 5.0,
                },
                WriteOp::Increment {
                    collection: "accounts".into(),
                    id: "missing".into(),
                    field: "balance".into(),
                    by: 5.0,
                },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DocumentNotFound { .. }));
        let stored = store.document("accounts", &id).unwrap();
        assert_eq!(stored.get("balance"), Some(&json!(10.0)));
    }

    #[tokio::test]
    async fn increment_adds_to_numeric_field() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert("accounts", fields(json!({"balance": 50000.0})))
            .await
            .unwrap();
        store
            .commit(vec![WriteOp::Increment {
                collection: "accounts".into(),
                id: id.clone(),
                field: "balance".into(),
                by: -120.0,
            }])
            .await
            .unwrap();
        let stored = store.document("accounts", &id).unwrap();
        assert_eq!(stored.get("balance").and_then(Value::as_f64), Some(49880.0));
    }

    #[tokio::test]
    async fn dropped_feeds_are_pruned() {
        let store = InMemoryDocumentStore::new();
        let feed = store
            .watch(Query::collection("transactions").order_by("date", Direction::Descending))
            .unwrap();
        assert_eq!(store.active_watchers(), 1);
        drop(feed);
        assert_eq!(store.active_watchers(), 0);
    }

    #[tokio::test]
    async fn pushed_errors_reach_only_matching_feeds() {
        let store = InMemoryDocumentStore::new();
        let mut accounts = store.watch(Query::collection("accounts")).unwrap();
        let mut transactions = store.watch(Query::collection("transactions")).unwrap();
        accounts.next().await.unwrap().unwrap();
        transactions.next().await.unwrap().unwrap();

        store.push_error("accounts", StoreError::Unavailable("permission denied".into()));
        assert_eq!(
            accounts.next().await.unwrap(),
            Err(StoreError::Unavailable("permission denied".into()))
        );

        store.put_raw("transactions", "t1", Fields::new());
        assert_eq!(transactions.next().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_reads_a_single_document() {
        let store = InMemoryDocumentStore::new();
        store.put_raw("accounts", "a1", fields(json!({"name": "Cash"})));
        let doc = store.get("accounts", "a1").await.unwrap().unwrap();
        assert_eq!(doc.id, "a1");
        assert_eq!(doc.fields.get("name"), Some(&json!("Cash")));
        assert_eq!(store.get("accounts", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn injected_write_failure_is_reported() {
        let store = InMemoryDocumentStore::new();
        store.fail_writes(Some("quota exceeded"));
        let err = store.insert("accounts", Fields::new()).await.unwrap_err();
        assert_eq!(err, StoreError::Write("quota exceeded".into()));
        assert!(store.documents("accounts").is_empty());
    }
}
