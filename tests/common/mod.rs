#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{json, Value};
use smart_finance::{
    config::LedgerConfig,
    domain::Identity,
    ledger::{LedgerSnapshot, LedgerStore, LocalBackend},
    storage::{DocumentStore, Fields, InMemoryDocumentStore},
};

/// Fixed "today" so seeded data is reproducible.
pub fn today() -> NaiveDate {
    date(2024, 10, 14)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn account_fields(owner: &str, name: &str, balance: f64) -> Fields {
    fields(json!({ "userId": owner, "name": name, "balance": balance, "color": "bg-blue-500" }))
}

pub fn user(uid: &str) -> Identity {
    Identity::authenticated(uid, format!("{uid}@example.com"))
}

/// A ledger without a document store: every identity runs on local data.
pub fn local_ledger() -> LedgerStore {
    local_ledger_with(LedgerConfig::default())
}

pub fn local_ledger_with(config: LedgerConfig) -> LedgerStore {
    LedgerStore::with_local_backend(None, config, LocalBackend::with_today(today()))
}

/// A ledger connected to a fresh in-memory document store.
pub fn remote_ledger() -> (Arc<LedgerStore>, Arc<InMemoryDocumentStore>) {
    remote_ledger_with(LedgerConfig::default())
}

pub fn remote_ledger_with(config: LedgerConfig) -> (Arc<LedgerStore>, Arc<InMemoryDocumentStore>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let remote: Arc<dyn DocumentStore> = store.clone();
    let ledger =
        LedgerStore::with_local_backend(Some(remote), config, LocalBackend::with_today(today()));
    (Arc::new(ledger), store)
}

/// Waits until the snapshot satisfies `predicate`, failing after two seconds.
pub async fn wait_for<F>(ledger: &LedgerStore, mut predicate: F) -> LedgerSnapshot
where
    F: FnMut(&LedgerSnapshot) -> bool,
{
    let mut rx = ledger.subscribe();
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        rx.wait_for(|snapshot| predicate(snapshot))
            .await
            .map(|snapshot| snapshot.clone())
    })
    .await;
    result
        .expect("ledger reached the expected state in time")
        .expect("ledger store still alive")
}

pub fn balance_of(snapshot: &LedgerSnapshot, id: &str) -> f64 {
    snapshot.account(id).map(|account| account.balance).expect("account present")
}
