//! Fixed dataset shown in local and demo mode.

use chrono::NaiveDate;

use crate::domain::{Account, Transaction, TransactionType};

pub fn seed_accounts() -> Vec<Account> {
    vec![
        Account::with_id("1", "Main Cash", 52400.0, "bg-blue-500"),
        Account::with_id("2", "Cathay Bank", 185000.0, "bg-green-500"),
    ]
}

pub fn seed_transactions(today: NaiveDate) -> Vec<Transaction> {
    vec![
        Transaction {
            id: "t1".into(),
            account_id: "1".into(),
            amount: 120.0,
            kind: TransactionType::Expense,
            category: "Food".into(),
            note: Some("Louisa Coffee".into()),
            date: today,
        },
        Transaction {
            id: "t2".into(),
            account_id: "2".into(),
            amount: 48000.0,
            kind: TransactionType::Income,
            category: "Salary".into(),
            note: Some("October salary".into()),
            date: today,
        },
    ]
}
