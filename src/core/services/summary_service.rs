use chrono::{Datelike, NaiveDate};

use crate::domain::{Account, Transaction, TransactionType, DEFAULT_CATEGORIES};

/// Income and expense sums for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonthTotals {
    pub income: f64,
    pub expense: f64,
}

impl MonthTotals {
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub amount: f64,
    /// Fraction of the month's expense, in `0.0..=1.0`.
    pub share: f64,
}

/// Dashboard figures derived from a ledger snapshot.
pub struct SummaryService;

fn same_month(date: NaiveDate, month: NaiveDate) -> bool {
    date.year() == month.year() && date.month() == month.month()
}

impl SummaryService {
    pub fn total_balance(accounts: &[Account]) -> f64 {
        accounts.iter().map(|account| account.balance).sum()
    }

    /// Totals for the calendar month containing `month`.
    pub fn month_totals(transactions: &[Transaction], month: NaiveDate) -> MonthTotals {
        transactions
            .iter()
            .filter(|txn| same_month(txn.date, month))
            .fold(MonthTotals::default(), |mut totals, txn| {
                match txn.kind {
                    TransactionType::Income => totals.income += txn.amount,
                    TransactionType::Expense => totals.expense += txn.amount,
                }
                totals
            })
    }

    /// Per-category expense for the month, in default category order, zero
    /// categories omitted.
    pub fn expense_breakdown(
        transactions: &[Transaction],
        month: NaiveDate,
        limit: usize,
    ) -> Vec<CategoryShare> {
        let expenses: Vec<&Transaction> = transactions
            .iter()
            .filter(|txn| txn.is_expense() && same_month(txn.date, month))
            .collect();
        let total: f64 = expenses.iter().map(|txn| txn.amount).sum();

        DEFAULT_CATEGORIES
            .iter()
            .filter_map(|category| {
                let amount: f64 = expenses
                    .iter()
                    .filter(|txn| txn.category == *category)
                    .map(|txn| txn.amount)
                    .sum();
                (amount > 0.0).then(|| CategoryShare {
                    category: (*category).to_string(),
                    amount,
                    share: if total > 0.0 { amount / total } else { 0.0 },
                })
            })
            .take(limit)
            .collect()
    }

    /// The `n` newest transactions; the ledger keeps them date-descending.
    pub fn recent(transactions: &[Transaction], n: usize) -> &[Transaction] {
        &transactions[..n.min(transactions.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(
        kind: TransactionType,
        amount: f64,
        category: &str,
        date: (i32, u32, u32),
    ) -> Transaction {
        Transaction {
            id: format!("{category}-{amount}"),
            account_id: "1".into(),
            amount,
            kind,
            category: category.into(),
            note: None,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    fn october() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    #[test]
    fn month_totals_ignore_same_month_of_other_years() {
        let transactions = vec![
            txn(TransactionType::Income, 48000.0, "Salary", (2024, 10, 5)),
            txn(TransactionType::Expense, 120.0, "Food", (2024, 10, 6)),
            txn(TransactionType::Expense, 999.0, "Food", (2023, 10, 6)),
        ];
        let totals = SummaryService::month_totals(&transactions, october());
        assert_eq!(totals.income, 48000.0);
        assert_eq!(totals.expense, 120.0);
        assert_eq!(totals.net(), 47880.0);
    }

    #[test]
    fn breakdown_follows_category_order_and_limit() {
        let transactions = vec![
            txn(TransactionType::Expense, 300.0, "Shopping", (2024, 10, 2)),
            txn(TransactionType::Expense, 100.0, "Food", (2024, 10, 3)),
            txn(TransactionType::Expense, 100.0, "Rent", (2024, 10, 4)),
            txn(TransactionType::Income, 500.0, "Food", (2024, 10, 4)),
            txn(TransactionType::Expense, 50.0, "Custom", (2024, 10, 4)),
        ];
        let breakdown = SummaryService::expense_breakdown(&transactions, october(), 2);
        let names: Vec<&str> = breakdown.iter().map(|share| share.category.as_str()).collect();
        assert_eq!(names, vec!["Food", "Shopping"]);
        assert_eq!(breakdown[0].amount, 100.0);
        assert_eq!(breakdown[1].share, 300.0 / 550.0);
    }

    #[test]
    fn empty_month_has_no_breakdown() {
        assert!(SummaryService::expense_breakdown(&[], october(), 5).is_empty());
        assert_eq!(SummaryService::month_totals(&[], october()), MonthTotals::default());
    }

    #[test]
    fn recent_is_clamped() {
        let transactions = vec![txn(TransactionType::Expense, 1.0, "Food", (2024, 10, 1))];
        assert_eq!(SummaryService::recent(&transactions, 5).len(), 1);
        assert!(SummaryService::recent(&transactions, 0).is_empty());
    }

    #[test]
    fn total_balance_sums_signed_balances() {
        let accounts = vec![
            Account::with_id("1", "Cash", 52400.0, "bg-blue-500"),
            Account::with_id("2", "Card", -400.0, "bg-pink-500"),
        ];
        assert_eq!(SummaryService::total_balance(&accounts), 52000.0);
    }
}
