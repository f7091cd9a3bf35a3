//! Observable aggregates
//!
//! Every derived value the engine exposes lives in a `watch` channel: a new
//! subscriber sees the latest value immediately and is woken on each change.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A published value plus its freshness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate<T> {
    pub value: T,
    /// Set when the last recompute failed; `value` is the last known good one
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}

/// Owner side of one observable aggregate
pub struct Observable<T> {
    tx: watch::Sender<Aggregate<T>>,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(value: T, updated_at: DateTime<Utc>) -> Self {
        let (tx, _) = watch::channel(Aggregate {
            value,
            stale: false,
            updated_at,
        });
        Self { tx }
    }

    /// Publish a fresh value; returns whether subscribers were notified
    ///
    /// An equal value on a fresh aggregate is swallowed so a repeated
    /// recompute does not wake anyone.
    pub fn publish(&self, value: T, updated_at: DateTime<Utc>) -> bool {
        self.tx.send_if_modified(|current| {
            if current.value == value && !current.stale {
                return false;
            }
            current.value = value;
            current.stale = false;
            current.updated_at = updated_at;
            true
        })
    }

    /// Flag the retained value as stale
    pub fn mark_stale(&self) -> bool {
        self.tx.send_if_modified(|current| {
            if current.stale {
                return false;
            }
            current.stale = true;
            true
        })
    }

    pub fn current(&self) -> Aggregate<T> {
        self.tx.borrow().clone()
    }

    pub fn is_stale(&self) -> bool {
        self.tx.borrow().stale
    }

    pub fn subscribe(&self) -> watch::Receiver<Aggregate<T>> {
        self.tx.subscribe()
    }

    /// The aggregate as a `Stream`, starting with the current value
    pub fn stream(&self) -> WatchStream<Aggregate<T>> {
        WatchStream::new(self.tx.subscribe())
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Observables created on demand per key (bucket, window, granularity)
///
/// Entries nobody subscribes to any more are pruned before each refresh.
pub struct KeyedObservables<K, T> {
    entries: Mutex<HashMap<K, Observable<T>>>,
}

impl<K, T> Default for KeyedObservables<K, T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> KeyedObservables<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<K, Observable<T>>) -> R) -> R {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut entries)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.with_entries(|entries| entries.contains_key(key))
    }

    /// Latest aggregate of an entry, without subscribing
    pub fn current(&self, key: &K) -> Option<Aggregate<T>> {
        self.with_entries(|entries| entries.get(key).map(Observable::current))
    }

    /// Subscribe to an existing entry
    pub fn subscribe(&self, key: &K) -> Option<watch::Receiver<Aggregate<T>>> {
        self.with_entries(|entries| entries.get(key).map(Observable::subscribe))
    }

    /// Subscribe, seeding the entry with `value` if it does not exist yet
    pub fn subscribe_or_insert(
        &self,
        key: K,
        value: T,
        at: DateTime<Utc>,
    ) -> watch::Receiver<Aggregate<T>> {
        self.with_entries(|entries| {
            entries
                .entry(key)
                .or_insert_with(|| Observable::new(value, at))
                .subscribe()
        })
    }

    pub fn publish(&self, key: &K, value: T, at: DateTime<Utc>) -> bool {
        self.with_entries(|entries| {
            entries
                .get(key)
                .map(|o| o.publish(value, at))
                .unwrap_or(false)
        })
    }

    pub fn mark_stale(&self, key: &K) -> bool {
        self.with_entries(|entries| entries.get(key).map(Observable::mark_stale).unwrap_or(false))
    }

    /// Drop unobserved entries and return the keys still being watched
    pub fn prune(&self) -> Vec<K> {
        self.with_entries(|entries| {
            entries.retain(|_, o| o.receiver_count() > 0);
            entries.keys().cloned().collect()
        })
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
