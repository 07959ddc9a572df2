//! Typed decode/encode of ledger records at the document store boundary.
//!
//! Decoding fails closed: a record missing a required field, or carrying a
//! value of the wrong shape, yields `StoreError::Decode` instead of a
//! half-populated entity.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{Document, Fields, ACCOUNTS, OWNER_FIELD, TRANSACTIONS};
use crate::domain::{Account, Transaction, TransactionType, ACCOUNT_COLORS};
use crate::errors::StoreError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct AccountRecord {
    name: String,
    balance: f64,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRecord {
    account_id: String,
    amount: f64,
    #[serde(rename = "type")]
    kind: TransactionType,
    category: String,
    #[serde(default)]
    note: Option<String>,
    date: String,
}

fn decode_error(collection: &str, id: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Decode {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: reason.into(),
    }
}

/// Accepts `YYYY-MM-DD` or any longer ISO-8601 timestamp starting with one.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

pub fn decode_account(doc: &Document) -> Result<Account, StoreError> {
    let record: AccountRecord = serde_json::from_value(Value::Object(doc.fields.clone()))
        .map_err(|err| decode_error(ACCOUNTS, &doc.id, err.to_string()))?;
    if !record.balance.is_finite() {
        return Err(decode_error(ACCOUNTS, &doc.id, "balance is not finite"));
    }
    Ok(Account {
        id: doc.id.clone(),
        name: record.name,
        balance: record.balance,
        color: record
            .color
            .unwrap_or_else(|| ACCOUNT_COLORS[0].to_string()),
    })
}

pub fn decode_transaction(doc: &Document) -> Result<Transaction, StoreError> {
    let record: TransactionRecord = serde_json::from_value(Value::Object(doc.fields.clone()))
        .map_err(|err| decode_error(TRANSACTIONS, &doc.id, err.to_string()))?;
    if !record.amount.is_finite() || record.amount < 0.0 {
        return Err(decode_error(
            TRANSACTIONS,
            &doc.id,
            format!("amount must be a non-negative number, got {}", record.amount),
        ));
    }
    let date = parse_date(&record.date).ok_or_else(|| {
        decode_error(
            TRANSACTIONS,
            &doc.id,
            format!("invalid date `{}`", record.date),
        )
    })?;
    Ok(Transaction {
        id: doc.id.clone(),
        account_id: record.account_id,
        amount: record.amount,
        kind: record.kind,
        category: record.category,
        note: record.note.filter(|note| !note.is_empty()),
        date,
    })
}

pub fn decode_accounts(docs: &[Document]) -> Result<Vec<Account>, StoreError> {
    docs.iter().map(decode_account).collect()
}

pub fn decode_transactions(docs: &[Document]) -> Result<Vec<Transaction>, StoreError> {
    docs.iter().map(decode_transaction).collect()
}

pub fn encode_account(account: &Account, owner: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".into(), Value::from(account.name.clone()));
    fields.insert("balance".into(), Value::from(account.balance));
    fields.insert("color".into(), Value::from(account.color.clone()));
    fields.insert(OWNER_FIELD.into(), Value::from(owner));
    fields.insert("createdAt".into(), Value::from(Utc::now().to_rfc3339()));
    fields
}

pub fn encode_transaction(txn: &Transaction, owner: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("accountId".into(), Value::from(txn.account_id.clone()));
    fields.insert("amount".into(), Value::from(txn.amount));
    fields.insert("type".into(), Value::from(txn.kind.as_str()));
    fields.insert("category".into(), Value::from(txn.category.clone()));
    if let Some(note) = &txn.note {
        fields.insert("note".into(), Value::from(note.clone()));
    }
    fields.insert(
        "date".into(),
        Value::from(txn.date.format(DATE_FORMAT).to_string()),
    );
    fields.insert(OWNER_FIELD.into(), Value::from(owner));
    fields
}
