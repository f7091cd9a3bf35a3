//! Transaction service
//!
//! The validated write path into the ledger. Every record is checked here
//! before the store sees it, so no aggregate ever recomputes on input that
//! would later be rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{FintraxError, FintraxResult};
use crate::models::{
    Category, Money, RecurrencePeriod, TimeRange, Transaction, TransactionId, TransactionType,
};
use crate::storage::LedgerStore;

use super::period::PeriodCalendar;

/// Service for transaction management
pub struct TransactionService {
    store: Arc<dyn LedgerStore>,
    calendar: PeriodCalendar,
}

/// Options for filtering transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by half-open time range
    pub range: Option<TimeRange>,
    /// Filter by category
    pub category: Option<Category>,
    /// Filter by type
    pub transaction_type: Option<TransactionType>,
    /// Maximum number of transactions to return
    pub limit: Option<usize>,
}

impl TransactionFilter {
    /// Create a new empty filter
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Limit results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Input for creating a new transaction
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub description: String,
    /// Defaults to `Income` for income and `Other` for expenses
    pub category: Option<Category>,
    /// Defaults to now
    pub occurred_at: Option<DateTime<Utc>>,
    pub recurrence: Option<RecurrencePeriod>,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    pub transaction_type: Option<TransactionType>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the recurrence marker
    pub recurrence: Option<Option<RecurrencePeriod>>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn LedgerStore>, calendar: PeriodCalendar) -> Self {
        Self { store, calendar }
    }

    /// Create a new transaction
    pub async fn create(&self, input: CreateTransactionInput) -> FintraxResult<Transaction> {
        let category = input.category.unwrap_or(match input.transaction_type {
            TransactionType::Income => Category::Income,
            TransactionType::Expense => Category::Other,
        });
        let mut txn = Transaction::new(
            input.transaction_type,
            input.amount,
            input.description,
            category,
            input.occurred_at.unwrap_or_else(|| self.calendar.now()),
        )?;
        txn.recurrence = input.recurrence;

        self.store.insert(txn.clone()).await?;
        info!(id = %txn.id, kind = %txn.transaction_type, amount = %txn.amount, "transaction recorded");
        Ok(txn)
    }

    /// Get a transaction by ID
    pub async fn get(&self, id: TransactionId) -> FintraxResult<Option<Transaction>> {
        self.store.get(id).await
    }

    /// Find a transaction by full ID or by the short ID shown in listings
    pub async fn find(&self, identifier: &str) -> FintraxResult<Option<Transaction>> {
        if let Ok(id) = identifier.parse::<TransactionId>() {
            return self.store.get(id).await;
        }
        let mut matches: Vec<Transaction> = self
            .store
            .scan_all()
            .await?
            .into_iter()
            .filter(|t| t.id.matches_short(identifier))
            .collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(FintraxError::Validation(format!(
                "'{}' matches more than one transaction",
                identifier
            ))),
        }
    }

    /// List transactions, newest first
    pub async fn list(&self, filter: TransactionFilter) -> FintraxResult<Vec<Transaction>> {
        let mut transactions = match filter.range {
            Some(range) => self.store.query_range(range).await?,
            None => self.store.scan_all().await?,
        };

        if let Some(category) = filter.category {
            transactions.retain(|t| t.category == category);
        }
        if let Some(transaction_type) = filter.transaction_type {
            transactions.retain(|t| t.transaction_type == transaction_type);
        }

        transactions.reverse();
        if let Some(limit) = filter.limit {
            transactions.truncate(limit);
        }
        Ok(transactions)
    }

    /// Update a transaction in place, keeping its identity
    pub async fn update(
        &self,
        id: TransactionId,
        input: UpdateTransactionInput,
    ) -> FintraxResult<Transaction> {
        let mut txn = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| FintraxError::transaction_not_found(id.to_string()))?;

        if let Some(transaction_type) = input.transaction_type {
            // Switching to income implies the reserved category unless one is given
            if transaction_type == TransactionType::Income && input.category.is_none() {
                txn.category = Category::Income;
            }
            txn.transaction_type = transaction_type;
        }
        if let Some(amount) = input.amount {
            txn.amount = amount;
        }
        if let Some(description) = input.description {
            txn.description = description.trim().to_string();
        }
        if let Some(category) = input.category {
            txn.category = category;
        }
        if let Some(occurred_at) = input.occurred_at {
            txn.occurred_at = occurred_at;
        }
        if let Some(recurrence) = input.recurrence {
            txn.recurrence = recurrence;
        }

        txn.validate()?;
        self.store.update(txn.clone()).await?;
        info!(id = %txn.id, "transaction updated");
        Ok(txn)
    }

    /// Delete a transaction, returning the removed record
    pub async fn delete(&self, id: TransactionId) -> FintraxResult<Transaction> {
        let txn = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| FintraxError::transaction_not_found(id.to_string()))?;
        if !self.store.delete(id).await? {
            return Err(FintraxError::transaction_not_found(id.to_string()));
        }
        info!(id = %txn.id, "transaction deleted");
        Ok(txn)
    }

    pub async fn count(&self) -> FintraxResult<usize> {
        self.store.count().await
    }
}
