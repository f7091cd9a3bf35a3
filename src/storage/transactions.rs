//! JSON-backed ledger store
//!
//! Manages loading and saving transactions to transactions.json and
//! broadcasting a [`LedgerChange`] for every committed mutation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::error::{FintraxError, FintraxResult};
use crate::models::{TimeRange, Transaction, TransactionId};

use super::file_io::{read_json, write_json_atomic};
use super::ledger::{LedgerChange, LedgerStore};

/// Serializable transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

/// Ledger persisted as a single JSON document
///
/// Readers see the map as of the last committed mutation: a mutation is
/// applied to a copy, written to disk, and only then swapped in.
pub struct JsonLedgerStore {
    /// `None` keeps the ledger in memory only
    path: Option<PathBuf>,
    data: RwLock<HashMap<TransactionId, Transaction>>,
    write_gate: Mutex<()>,
    events: broadcast::Sender<LedgerChange>,
}

impl JsonLedgerStore {
    /// Create a ledger backed by `path`; call [`load`](Self::load) to read it
    pub fn new(path: PathBuf, event_buffer: usize) -> Self {
        Self::build(Some(path), event_buffer)
    }

    /// Create a ledger that is never written to disk
    pub fn in_memory(event_buffer: usize) -> Self {
        Self::build(None, event_buffer)
    }

    fn build(path: Option<PathBuf>, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            write_gate: Mutex::new(()),
            events,
        }
    }

    /// Load transactions from disk, rejecting files holding invalid records
    pub fn load(&self) -> FintraxResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file_data: TransactionData = read_json(path)?;

        let mut loaded = HashMap::with_capacity(file_data.transactions.len());
        for txn in file_data.transactions {
            txn.validate().map_err(|e| {
                FintraxError::Storage(format!(
                    "{} holds an invalid transaction {}: {}",
                    path.display(),
                    txn.id,
                    e
                ))
            })?;
            loaded.insert(txn.id, txn);
        }

        let mut data = self.data.write().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        debug!(count = loaded.len(), "loaded ledger");
        *data = loaded;
        Ok(())
    }

    fn snapshot(&self) -> FintraxResult<HashMap<TransactionId, Transaction>> {
        let data = self.data.read().map_err(|e| {
            FintraxError::StoreUnavailable(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.clone())
    }

    /// Persist `next`, swap it in and announce `change`
    ///
    /// Must be called with the write gate held so events leave in commit order.
    fn commit(
        &self,
        next: HashMap<TransactionId, Transaction>,
        change: LedgerChange,
    ) -> FintraxResult<()> {
        if let Some(path) = &self.path {
            let transactions = sorted(next.values().cloned().collect());
            write_json_atomic(path, &TransactionData { transactions })?;
        }

        let mut data = self.data.write().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = next;
        drop(data);

        debug!(kind = ?change.kind, id = %change.id, "ledger change committed");
        // No receivers is not an error: nothing is listening yet
        let _ = self.events.send(change);
        Ok(())
    }
}

fn sorted(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));
    transactions
}

#[async_trait]
impl LedgerStore for JsonLedgerStore {
    async fn insert(&self, txn: Transaction) -> FintraxResult<()> {
        txn.validate()?;
        let _gate = self.write_gate.lock().await;

        let mut next = self.snapshot()?;
        if next.contains_key(&txn.id) {
            return Err(FintraxError::Validation(format!(
                "transaction {} already exists",
                txn.id
            )));
        }
        let change = LedgerChange::inserted(&txn);
        next.insert(txn.id, txn);
        self.commit(next, change)
    }

    async fn update(&self, txn: Transaction) -> FintraxResult<()> {
        txn.validate()?;
        let _gate = self.write_gate.lock().await;

        let mut next = self.snapshot()?;
        let previous = next
            .get(&txn.id)
            .cloned()
            .ok_or_else(|| FintraxError::transaction_not_found(txn.id.to_string()))?;
        let change = LedgerChange::updated(&previous, &txn);
        next.insert(txn.id, txn);
        self.commit(next, change)
    }

    async fn delete(&self, id: TransactionId) -> FintraxResult<bool> {
        let _gate = self.write_gate.lock().await;

        let mut next = self.snapshot()?;
        let Some(removed) = next.remove(&id) else {
            return Ok(false);
        };
        self.commit(next, LedgerChange::deleted(&removed))?;
        Ok(true)
    }

    async fn get(&self, id: TransactionId) -> FintraxResult<Option<Transaction>> {
        let data = self.data.read().map_err(|e| {
            FintraxError::StoreUnavailable(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.get(&id).cloned())
    }

    async fn query_range(&self, range: TimeRange) -> FintraxResult<Vec<Transaction>> {
        let data = self.data.read().map_err(|e| {
            FintraxError::StoreUnavailable(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(sorted(
            data.values()
                .filter(|t| range.contains(t.occurred_at))
                .cloned()
                .collect(),
        ))
    }

    async fn scan_all(&self) -> FintraxResult<Vec<Transaction>> {
        Ok(sorted(self.snapshot()?.into_values().collect()))
    }

    async fn count(&self) -> FintraxResult<usize> {
        let data = self.data.read().map_err(|e| {
            FintraxError::StoreUnavailable(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.len())
    }

    fn subscribe(&self) -> FintraxResult<broadcast::Receiver<LedgerChange>> {
        Ok(self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Money};
    use crate::storage::ledger::ChangeKind;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 12, 0, 0).unwrap()
    }

    fn groceries(m: u32, d: u32) -> Transaction {
        Transaction::expense(Money::from_cents(4_000), "Groceries", Category::Food, at(m, d))
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_get_count() {
        let store = JsonLedgerStore::in_memory(16);
        let txn = groceries(1, 5);
        store.insert(txn.clone()).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(txn.id).await.unwrap(), Some(txn));
        assert_eq!(store.get(TransactionId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = JsonLedgerStore::in_memory(16);
        let txn = groceries(1, 5);
        store.insert(txn.clone()).await.unwrap();
        let err = store.insert(txn).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_invalid_record_never_reaches_ledger() {
        let store = JsonLedgerStore::in_memory(16);
        let mut txn = groceries(1, 5);
        txn.category = Category::Income;
        assert!(store.insert(txn).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = JsonLedgerStore::in_memory(16);
        let err = store.update(groceries(1, 5)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let store = JsonLedgerStore::in_memory(16);
        let txn = groceries(1, 5);
        store.insert(txn.clone()).await.unwrap();
        assert!(store.delete(txn.id).await.unwrap());
        assert!(!store.delete(txn.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_range_is_half_open_and_ordered() {
        let store = JsonLedgerStore::in_memory(16);
        let late = groceries(1, 20);
        let early = groceries(1, 2);
        let boundary = Transaction::expense(
            Money::from_cents(100),
            "Coffee",
            Category::Food,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        for txn in [late.clone(), early.clone(), boundary] {
            store.insert(txn).await.unwrap();
        }

        let january = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let found = store.query_range(january).await.unwrap();
        assert_eq!(found, vec![early, late]);
    }

    #[tokio::test]
    async fn test_events_carry_previous_timestamp() {
        let store = JsonLedgerStore::in_memory(16);
        let mut events = store.subscribe().unwrap();

        let txn = groceries(1, 31);
        store.insert(txn.clone()).await.unwrap();
        let mut moved = txn.clone();
        moved.occurred_at = at(2, 1);
        store.update(moved).await.unwrap();
        store.delete(txn.id).await.unwrap();

        let inserted = events.recv().await.unwrap();
        assert_eq!(inserted.kind, ChangeKind::Inserted);
        assert_eq!(inserted.previous_occurred_at, None);

        let updated = events.recv().await.unwrap();
        assert_eq!(updated.kind, ChangeKind::Updated);
        assert_eq!(updated.occurred_at, at(2, 1));
        assert_eq!(updated.previous_occurred_at, Some(at(1, 31)));

        let deleted = events.recv().await.unwrap();
        assert_eq!(deleted.kind, ChangeKind::Deleted);
        assert_eq!(deleted.previous_occurred_at, Some(at(2, 1)));
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transactions.json");

        let store = JsonLedgerStore::new(path.clone(), 16);
        let txn = groceries(3, 3);
        store.insert(txn.clone()).await.unwrap();

        let reloaded = JsonLedgerStore::new(path, 16);
        reloaded.load().unwrap();
        assert_eq!(reloaded.scan_all().await.unwrap(), vec![txn]);
    }
}
