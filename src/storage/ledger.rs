//! Ledger store contract
//!
//! The ledger exclusively owns transaction identity and durability. Every
//! committed mutation is announced on a broadcast channel so each aggregate
//! component can hold its own independent subscription.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::FintraxResult;
use crate::models::{TimeRange, Transaction, TransactionId};

/// Kind of committed mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// Change notification emitted after a mutation is durably recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerChange {
    pub kind: ChangeKind,
    pub id: TransactionId,
    /// Timestamp of the record after the change (the removed record's, for deletes)
    pub occurred_at: DateTime<Utc>,
    /// Timestamp before the change; set for updates and deletes
    pub previous_occurred_at: Option<DateTime<Utc>>,
}

impl LedgerChange {
    pub fn inserted(txn: &Transaction) -> Self {
        Self {
            kind: ChangeKind::Inserted,
            id: txn.id,
            occurred_at: txn.occurred_at,
            previous_occurred_at: None,
        }
    }

    pub fn updated(previous: &Transaction, current: &Transaction) -> Self {
        Self {
            kind: ChangeKind::Updated,
            id: current.id,
            occurred_at: current.occurred_at,
            previous_occurred_at: Some(previous.occurred_at),
        }
    }

    pub fn deleted(removed: &Transaction) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            id: removed.id,
            occurred_at: removed.occurred_at,
            previous_occurred_at: Some(removed.occurred_at),
        }
    }

    /// Every instant whose buckets this change may have affected
    pub fn touched_instants(&self) -> Vec<DateTime<Utc>> {
        let mut instants = vec![self.occurred_at];
        if let Some(previous) = self.previous_occurred_at {
            if previous != self.occurred_at {
                instants.push(previous);
            }
        }
        instants
    }
}

/// Durable, ordered collection of transactions
///
/// Mutations are serialized per store. `query_range` is half-open and
/// returns transactions ordered by `occurred_at`, then id.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new transaction; an existing id is a validation error
    async fn insert(&self, txn: Transaction) -> FintraxResult<()>;

    /// Replace a transaction with the same id; a missing id is `NotFound`
    async fn update(&self, txn: Transaction) -> FintraxResult<()>;

    /// Remove a transaction, returning whether anything was removed
    async fn delete(&self, id: TransactionId) -> FintraxResult<bool>;

    async fn get(&self, id: TransactionId) -> FintraxResult<Option<Transaction>>;

    async fn query_range(&self, range: TimeRange) -> FintraxResult<Vec<Transaction>>;

    /// Every transaction in the ledger, in range-query order
    async fn scan_all(&self) -> FintraxResult<Vec<Transaction>>;

    async fn count(&self) -> FintraxResult<usize>;

    /// Independent receiver of change events committed after this call
    fn subscribe(&self) -> FintraxResult<broadcast::Receiver<LedgerChange>>;
}
