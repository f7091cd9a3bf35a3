//! Service layer for fintrax
//!
//! The aggregate components (balance, summary, categories, trend) each
//! consume ledger change events independently; the transaction and
//! recurring services are the validated write paths.

pub mod balance;
pub mod category;
pub mod observable;
pub mod period;
pub mod recurring;
pub mod retry;
pub mod summary;
pub mod trend;
pub mod transaction;

pub use balance::BalanceTracker;
pub use category::CategoryAnalytics;
pub use observable::{Aggregate, KeyedObservables, Observable};
pub use period::{Clock, FixedClock, PeriodCalendar, SystemClock};
pub use recurring::{CreateMonthlyExpenseInput, RecurringService};
pub use retry::{retry_with_backoff, LedgerReader, RetryPolicy};
pub use summary::SummaryCalculator;
pub use transaction::{
    CreateTransactionInput, TransactionFilter, TransactionService, UpdateTransactionInput,
};
pub use trend::TrendEngine;

use async_trait::async_trait;

use crate::error::FintraxResult;
use crate::storage::LedgerChange;

/// A component that keeps derived state in step with the ledger
///
/// Each subscriber owns its state; none depends on another, so the order
/// in which subscribers see a change does not matter.
#[async_trait]
pub trait ChangeSubscriber: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recompute whatever `change` touched
    async fn apply(&self, change: &LedgerChange) -> FintraxResult<()>;

    /// Recompute everything from a full read of the ledger
    async fn rebuild(&self) -> FintraxResult<()>;
}
