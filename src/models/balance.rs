//! Balance snapshots and financial summaries
//!
//! Both are derived values: they can always be rebuilt from the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FintraxError, FintraxResult};

use super::ids::SnapshotId;
use super::money::Money;
use super::period::{Granularity, PeriodBucket};
use super::transaction::{Transaction, TransactionType};

/// What a balance snapshot summarizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "bucket", rename_all = "lowercase")]
pub enum BalanceScope {
    /// Every transaction in the ledger; the "current balance"
    Lifetime,
    /// Transactions inside one calendar bucket
    Bucket(PeriodBucket),
}

impl BalanceScope {
    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            Self::Lifetime => None,
            Self::Bucket(bucket) => Some(bucket.granularity()),
        }
    }
}

impl fmt::Display for BalanceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifetime => write!(f, "lifetime"),
            Self::Bucket(bucket) => write!(f, "{}", bucket),
        }
    }
}

/// Income and expense totals accumulated over a set of transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub income: Money,
    pub expenses: Money,
}

impl PeriodTotals {
    pub fn from_transactions<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> FintraxResult<Self> {
        let mut totals = Self::default();
        for txn in transactions {
            totals.add(txn.transaction_type, txn.amount)?;
        }
        Ok(totals)
    }

    /// Fails with `InvalidAmount` when a side would overflow
    pub fn add(&mut self, transaction_type: TransactionType, amount: Money) -> FintraxResult<()> {
        let side = self.side_mut(transaction_type);
        *side = side.checked_add(amount)?;
        Ok(())
    }

    /// Take back an amount previously added; a side never goes below zero
    pub fn remove(&mut self, transaction_type: TransactionType, amount: Money) -> FintraxResult<()> {
        let side = self.side_mut(transaction_type);
        let reduced = side.checked_sub(amount)?;
        if reduced.is_negative() {
            return Err(FintraxError::InvalidAmount(format!(
                "removing {} would leave negative {} totals",
                amount, transaction_type
            )));
        }
        *side = reduced;
        Ok(())
    }

    fn side_mut(&mut self, transaction_type: TransactionType) -> &mut Money {
        match transaction_type {
            TransactionType::Income => &mut self.income,
            TransactionType::Expense => &mut self.expenses,
        }
    }

    /// Both sides stay within `0..=i64::MAX`, so the difference always fits
    pub fn net(&self) -> Money {
        Money::from_cents(self.income.cents() - self.expenses.cents())
    }
}

/// Immutable balance snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub id: SnapshotId,
    pub total_income: Money,
    pub total_expenses: Money,
    /// Always `total_income - total_expenses`
    pub net_balance: Money,
    pub scope: BalanceScope,
    pub computed_at: DateTime<Utc>,
}

impl Balance {
    pub fn from_totals(totals: PeriodTotals, scope: BalanceScope, computed_at: DateTime<Utc>) -> Self {
        Self {
            id: SnapshotId::new(),
            total_income: totals.income,
            total_expenses: totals.expenses,
            net_balance: totals.net(),
            scope,
            computed_at,
        }
    }

    /// Zero-valued lifetime balance, used before anything has been recorded
    pub fn zero(computed_at: DateTime<Utc>) -> Self {
        Self::from_totals(PeriodTotals::default(), BalanceScope::Lifetime, computed_at)
    }

    pub fn totals(&self) -> PeriodTotals {
        PeriodTotals {
            income: self.total_income,
            expenses: self.total_expenses,
        }
    }

}

/// Totals and highlights for one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub bucket: PeriodBucket,
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_balance: Money,
    /// Net normalized to a 30-day month: `net * 30 / bucket.days()`, half-up
    pub monthly_average: Money,
    pub biggest_expense: Option<Transaction>,
    pub biggest_income: Option<Transaction>,
    pub transaction_count: usize,
}

impl FinancialSummary {
    /// Well-defined result for a bucket with no transactions
    pub fn empty(bucket: PeriodBucket) -> Self {
        Self {
            bucket,
            total_income: Money::zero(),
            total_expenses: Money::zero(),
            net_balance: Money::zero(),
            monthly_average: Money::zero(),
            biggest_expense: None,
            biggest_income: None,
            transaction_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_totals_net() {
        let mut totals = PeriodTotals::default();
        totals.add(TransactionType::Income, Money::from_cents(100_000)).unwrap();
        totals.add(TransactionType::Expense, Money::from_cents(40_000)).unwrap();
        assert_eq!(totals.net().cents(), 60_000);

        totals.remove(TransactionType::Expense, Money::from_cents(40_000)).unwrap();
        assert_eq!(totals.net().cents(), 100_000);
    }

    #[test]
    fn test_totals_overflow_is_invalid_amount() {
        let half = Money::from_cents(i64::MAX / 2 + 1);
        let mut totals = PeriodTotals::default();
        totals.add(TransactionType::Income, half).unwrap();
        assert!(matches!(
            totals.add(TransactionType::Income, half),
            Err(FintraxError::InvalidAmount(_))
        ));
        // the failed add left the side untouched
        assert_eq!(totals.income, half);
    }

    #[test]
    fn test_totals_never_go_negative() {
        let mut totals = PeriodTotals::default();
        totals.add(TransactionType::Expense, Money::from_cents(100)).unwrap();
        assert!(totals.remove(TransactionType::Expense, Money::from_cents(101)).is_err());
        assert_eq!(totals.expenses.cents(), 100);

        // extreme sides still net without overflow
        totals.add(TransactionType::Expense, Money::from_cents(i64::MAX - 100)).unwrap();
        assert_eq!(totals.net().cents(), -i64::MAX);
    }

    #[test]
    fn test_zero_balance() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let balance = Balance::zero(at);
        assert!(balance.net_balance.is_zero());
        assert_eq!(balance.scope, BalanceScope::Lifetime);
        assert_eq!(balance.computed_at, at);
    }

    #[test]
    fn test_scope_serialization() {
        let bucket = PeriodBucket::parse(Granularity::Monthly, "2024-03").unwrap();
        let json = serde_json::to_string(&BalanceScope::Bucket(bucket)).unwrap();
        let back: BalanceScope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BalanceScope::Bucket(bucket));
        assert_eq!(back.granularity(), Some(Granularity::Monthly));
    }
}
