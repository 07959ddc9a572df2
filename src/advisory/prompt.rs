use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Account, Transaction, TransactionType};

pub const RECENT_TRANSACTION_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDigest {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
}

/// What the advice prompt is allowed to see of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_balance: f64,
    pub account_count: usize,
    pub recent_transactions: Vec<TransactionDigest>,
}

impl FinancialSummary {
    /// `transactions` is expected newest first, as the ledger keeps it.
    pub fn from_ledger(accounts: &[Account], transactions: &[Transaction]) -> Self {
        Self {
            total_balance: accounts.iter().map(|account| account.balance).sum(),
            account_count: accounts.len(),
            recent_transactions: transactions
                .iter()
                .take(RECENT_TRANSACTION_LIMIT)
                .map(|txn| TransactionDigest {
                    kind: txn.kind,
                    amount: txn.amount,
                    category: txn.category.clone(),
                    date: txn.date,
                })
                .collect(),
        }
    }
}

pub fn advice_prompt(summary: &FinancialSummary) -> String {
    let recent =
        serde_json::to_string(&summary.recent_transactions).unwrap_or_else(|_| "[]".into());
    format!(
        "You are a professional personal finance advisor. Give concise, constructive advice \
based on the user's financial data.\n\
Data summary:\n\
- Total assets: ${total}\n\
- Number of accounts: {count}\n\
- Last {limit} transactions: {recent}\n\n\
Cover the following:\n\
1. Is anything unusual about the current spending pattern?\n\
2. Suggestions for optimizing savings or investments.\n\
3. One concrete tip toward a financial goal.\n\
Keep a friendly, professional tone and stay under 300 words.",
        total = summary.total_balance,
        count = summary.account_count,
        limit = RECENT_TRANSACTION_LIMIT,
    )
}

pub const INSPIRATION_PROMPT: &str = "Write one short, original motivational sentence about saving money \
or personal finance. Reply with the sentence only, no quotes and no attribution.";

pub const MARKET_PROMPT: &str = "Using today's news, summarize the stock market: list the most \
actively traded stocks with their trading volume and percentage change, name the hot sectors, \
and give a one-paragraph summary. Answer only with JSON matching the provided schema.";
