//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;

use fintrax::config::settings::Settings;
use fintrax::models::{Category, Money, Transaction, TransactionType};
use fintrax::services::{Aggregate, CreateTransactionInput, FixedClock, PeriodCalendar};
use fintrax::storage::{BalanceSnapshotStore, JsonLedgerStore, LedgerStore, MonthlyExpenseStore};
use fintrax::Engine;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub ledger: Arc<dyn LedgerStore>,
    pub snapshots: Arc<BalanceSnapshotStore>,
    pub engine: Engine,
}

impl Harness {
    pub async fn start(now: DateTime<Utc>) -> Self {
        Self::start_with(Arc::new(JsonLedgerStore::in_memory(256)), now, Settings::default()).await
    }

    pub async fn start_with(
        ledger: Arc<dyn LedgerStore>,
        now: DateTime<Utc>,
        settings: Settings,
    ) -> Self {
        let clock = Arc::new(FixedClock::new(now));
        let snapshots = Arc::new(BalanceSnapshotStore::in_memory());
        let engine = Engine::start(
            ledger.clone(),
            Arc::new(MonthlyExpenseStore::in_memory()),
            snapshots.clone(),
            PeriodCalendar::new(clock.clone()),
            &settings,
        )
        .await
        .unwrap();
        Self {
            clock,
            ledger,
            snapshots,
            engine,
        }
    }

    /// Record a transaction and wait for the balance to reflect it
    pub async fn record(
        &self,
        kind: TransactionType,
        cents: i64,
        category: Category,
        occurred_at: DateTime<Utc>,
    ) -> Transaction {
        let mut rx = self.engine.balance().watch_current();
        let txn = self
            .engine
            .transactions()
            .create(CreateTransactionInput {
                transaction_type: kind,
                amount: Money::from_cents(cents),
                description: format!("{} {}", category, cents),
                category: Some(category),
                occurred_at: Some(occurred_at),
                recurrence: None,
            })
            .await
            .unwrap();
        changed(&mut rx).await;
        txn
    }

    pub async fn income(&self, cents: i64, occurred_at: DateTime<Utc>) -> Transaction {
        self.record(TransactionType::Income, cents, Category::Income, occurred_at)
            .await
    }

    pub async fn expense(
        &self,
        cents: i64,
        category: Category,
        occurred_at: DateTime<Utc>,
    ) -> Transaction {
        self.record(TransactionType::Expense, cents, category, occurred_at)
            .await
    }

    /// Delete and wait for the balance to reflect it
    pub async fn delete(&self, txn: &Transaction) {
        let mut rx = self.engine.balance().watch_current();
        self.engine.transactions().delete(txn.id).await.unwrap();
        changed(&mut rx).await;
    }
}

/// Wait for the next published value
pub async fn changed<T>(rx: &mut watch::Receiver<Aggregate<T>>) {
    tokio::time::timeout(WAIT, rx.changed())
        .await
        .expect("timed out waiting for an update")
        .expect("publisher dropped");
}

/// Wait until the published aggregate satisfies `pred`, returning a copy
pub async fn wait_until<T, F>(rx: &mut watch::Receiver<Aggregate<T>>, pred: F) -> Aggregate<T>
where
    T: Clone,
    F: FnMut(&Aggregate<T>) -> bool,
{
    let found = tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for an update")
        .expect("publisher dropped")
        .clone();
    found
}
