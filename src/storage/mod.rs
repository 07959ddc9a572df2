//! Document store boundary: live queries plus atomic batched writes.
//!
//! Records are plain JSON field maps. Typed decoding happens in [`records`],
//! never in the store itself.

pub mod memory;
pub mod records;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::errors::StoreError;

pub use memory::InMemoryDocumentStore;

pub const ACCOUNTS: &str = "accounts";
pub const TRANSACTIONS: &str = "transactions";
/// Field every record is tagged with; all ledger queries filter on it.
pub const OWNER_FIELD: &str = "userId";

pub type Fields = Map<String, Value>;

/// One delivery of a live query: the full result set, or a feed failure.
pub type QueryUpdate = Result<Vec<Document>, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters, an optional single-field ordering and an optional limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| fields.get(field) == Some(expected))
    }

    /// Filters, orders and truncates a full collection into this query's result.
    pub fn evaluate<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = (&'a String, &'a Fields)>,
    {
        let mut result: Vec<Document> = documents
            .into_iter()
            .filter(|(_, fields)| self.matches(fields))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        if let Some((field, direction)) = &self.order_by {
            result.sort_by(|a, b| {
                let ordering = compare_values(a.fields.get(field), b.fields.get(field));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            result.truncate(limit);
        }
        result
    }
}

/// Orders missing < numbers < strings; numbers numerically, strings lexically.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Merges `fields` into an existing document.
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Adds `by` to a numeric field of an existing document.
    Increment {
        collection: String,
        id: String,
        field: String,
        by: f64,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Insert { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Increment { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// Receiving half of a live query. Dropping it unsubscribes.
#[derive(Debug)]
pub struct LiveQuery {
    rx: mpsc::UnboundedReceiver<QueryUpdate>,
}

impl LiveQuery {
    pub fn new(rx: mpsc::UnboundedReceiver<QueryUpdate>) -> Self {
        Self { rx }
    }

    /// Waits for the next full result set. `None` once the store closes the feed.
    pub async fn next(&mut self) -> Option<QueryUpdate> {
        self.rx.recv().await
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribes to `query`. The current result is delivered first, then a
    /// fresh full result after every write touching the collection.
    fn watch(&self, query: Query) -> Result<LiveQuery, StoreError>;

    /// Applies all writes or none of them.
    async fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Reads one document straight from the store, bypassing live queries.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Inserts under a generated identifier and returns it.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.commit(vec![WriteOp::Insert {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        }])
        .await?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }])
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }])
        .await
    }
}
