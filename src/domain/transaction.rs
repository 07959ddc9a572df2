//! Recorded money movements and the signed-amount rule.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;
use crate::errors::StoreError;

/// Direction of a transaction. The stored amount is always a magnitude.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Applies the signed-amount rule: `+amount` for income, `-amount` for expense.
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            TransactionType::Income => amount,
            TransactionType::Expense => -amount,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    /// Plain reference; the account may be deleted independently.
    pub account_id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub date: NaiveDate,
}

impl Transaction {
    /// Effect of this transaction on its account's balance.
    pub fn signed_amount(&self) -> f64 {
        self.kind.signed(self.amount)
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Fields supplied by a caller recording a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: String,
    pub amount: f64,
    pub kind: TransactionType,
    pub category: String,
    pub note: Option<String>,
    pub date: NaiveDate,
}

impl NewTransaction {
    pub fn new(
        account_id: impl Into<String>,
        amount: f64,
        kind: TransactionType,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount,
            kind,
            category: category.into(),
            note: None,
            date,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Rejects amounts that are negative or not finite.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.amount.is_finite() {
            return Err(StoreError::Validation(format!(
                "amount must be a finite number, got {}",
                self.amount
            )));
        }
        if self.amount < 0.0 {
            return Err(StoreError::Validation(format!(
                "amount must not be negative, got {}",
                self.amount
            )));
        }
        Ok(())
    }

    /// Builds the stored transaction under a freshly generated identifier.
    pub fn into_transaction(self) -> Transaction {
        let note = self.note.filter(|note| !note.trim().is_empty());
        Transaction {
            id: Uuid::new_v4().to_string(),
            account_id: self.account_id,
            amount: self.amount,
            kind: self.kind,
            category: self.category,
            note,
            date: self.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 5).unwrap()
    }

    #[test]
    fn signed_amount_follows_type() {
        assert_eq!(TransactionType::Income.signed(45.0), 45.0);
        assert_eq!(TransactionType::Expense.signed(45.0), -45.0);
    }

    #[test]
    fn validate_rejects_negative_and_nan_amounts() {
        let base = NewTransaction::new("a", -1.0, TransactionType::Expense, "Food", date());
        assert!(matches!(base.validate(), Err(StoreError::Validation(_))));

        let nan = NewTransaction {
            amount: f64::NAN,
            ..base.clone()
        };
        assert!(nan.validate().is_err());

        let zero = NewTransaction { amount: 0.0, ..base };
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn blank_notes_are_dropped() {
        let txn = NewTransaction::new("a", 5.0, TransactionType::Income, "Bonus", date())
            .with_note("   ")
            .into_transaction();
        assert!(txn.note.is_none());
        assert!(!txn.id.is_empty());
    }

    #[test]
    fn stored_transaction_carries_its_balance_effect() {
        let txn = NewTransaction::new("a", 120.0, TransactionType::Expense, "Food", date())
            .into_transaction();
        assert_eq!(txn.signed_amount(), -120.0);
        assert!(txn.is_expense());
        assert_eq!(txn.id(), txn.id.as_str());
    }

    #[test]
    fn type_tag_serializes_uppercase() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, "\"EXPENSE\"");
        assert!(serde_json::from_str::<TransactionType>("\"income\"").is_err());
    }
}
