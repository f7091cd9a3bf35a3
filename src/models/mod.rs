//! Core data models for fintrax
//!
//! Ledger records (transactions, recurring obligations), the calendar
//! buckets they are grouped into, and the derived values computed from them.

pub mod analytics;
pub mod balance;
pub mod ids;
pub mod money;
pub mod monthly_expense;
pub mod period;
pub mod transaction;

pub use analytics::{CategoryBreakdown, ChartData, TrendData, YearOverYear, YoyChange};
pub use balance::{Balance, BalanceScope, FinancialSummary, PeriodTotals};
pub use ids::{MonthlyExpenseId, SnapshotId, TransactionId};
pub use money::{Money, Percentage};
pub use monthly_expense::MonthlyExpense;
pub use period::{Granularity, PeriodBucket, TimeRange};
pub use transaction::{Category, RecurrencePeriod, Transaction, TransactionType};
