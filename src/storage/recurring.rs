//! Recurring expense store
//!
//! Manages loading and saving monthly obligations to monthly_expenses.json
//! and publishes the active list (due day ascending) on every change.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use tokio::sync::watch;

use crate::error::{FintraxError, FintraxResult};
use crate::models::{MonthlyExpense, MonthlyExpenseId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable monthly expense data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct MonthlyExpenseData {
    monthly_expenses: Vec<MonthlyExpense>,
}

/// Repository for recurring obligations
pub struct MonthlyExpenseStore {
    path: Option<PathBuf>,
    data: RwLock<HashMap<MonthlyExpenseId, MonthlyExpense>>,
    active: watch::Sender<Vec<MonthlyExpense>>,
}

impl MonthlyExpenseStore {
    pub fn new(path: PathBuf) -> Self {
        Self::build(Some(path))
    }

    pub fn in_memory() -> Self {
        Self::build(None)
    }

    fn build(path: Option<PathBuf>) -> Self {
        let (active, _) = watch::channel(Vec::new());
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            active,
        }
    }

    /// Load monthly expenses from disk
    pub fn load(&self) -> FintraxResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file_data: MonthlyExpenseData = read_json(path)?;

        {
            let mut data = self.data.write().map_err(|e| {
                FintraxError::Storage(format!("Failed to acquire write lock: {}", e))
            })?;
            data.clear();
            for expense in file_data.monthly_expenses {
                data.insert(expense.id, expense);
            }
        }

        self.publish_active()
    }

    fn save(&self, data: &HashMap<MonthlyExpenseId, MonthlyExpense>) -> FintraxResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut monthly_expenses: Vec<_> = data.values().cloned().collect();
        sort_by_due_day(&mut monthly_expenses);
        write_json_atomic(path, &MonthlyExpenseData { monthly_expenses })
    }

    fn publish_active(&self) -> FintraxResult<()> {
        let active = self.list_active()?;
        self.active.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                *current = active;
                true
            }
        });
        Ok(())
    }

    /// Apply `mutate` to a copy of the data, persist it, then swap it in
    fn mutate<R>(
        &self,
        mutate: impl FnOnce(&mut HashMap<MonthlyExpenseId, MonthlyExpense>) -> FintraxResult<R>,
    ) -> FintraxResult<R> {
        let result = {
            let mut data = self.data.write().map_err(|e| {
                FintraxError::Storage(format!("Failed to acquire write lock: {}", e))
            })?;
            let mut next = data.clone();
            let result = mutate(&mut next)?;
            self.save(&next)?;
            *data = next;
            result
        };
        self.publish_active()?;
        Ok(result)
    }

    pub fn get(&self, id: MonthlyExpenseId) -> FintraxResult<Option<MonthlyExpense>> {
        let data = self.data.read().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.get(&id).cloned())
    }

    /// All obligations, active or not, ordered by due day then description
    pub fn list_all(&self) -> FintraxResult<Vec<MonthlyExpense>> {
        let data = self.data.read().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        let mut expenses: Vec<_> = data.values().cloned().collect();
        sort_by_due_day(&mut expenses);
        Ok(expenses)
    }

    /// Active obligations ordered by due day ascending
    pub fn list_active(&self) -> FintraxResult<Vec<MonthlyExpense>> {
        let mut expenses = self.list_all()?;
        expenses.retain(|e| e.is_active);
        Ok(expenses)
    }

    pub fn insert(&self, expense: MonthlyExpense) -> FintraxResult<()> {
        expense.validate()?;
        self.mutate(|data| {
            if data.contains_key(&expense.id) {
                return Err(FintraxError::Validation(format!(
                    "monthly expense {} already exists",
                    expense.id
                )));
            }
            data.insert(expense.id, expense);
            Ok(())
        })
    }

    pub fn update(&self, expense: MonthlyExpense) -> FintraxResult<()> {
        expense.validate()?;
        self.mutate(|data| {
            if !data.contains_key(&expense.id) {
                return Err(FintraxError::monthly_expense_not_found(expense.id.to_string()));
            }
            data.insert(expense.id, expense);
            Ok(())
        })
    }

    /// Remove an obligation outright, returning whether it existed
    pub fn delete(&self, id: MonthlyExpenseId) -> FintraxResult<bool> {
        self.mutate(|data| Ok(data.remove(&id).is_some()))
    }

    /// Receiver of the active list; the current list is available immediately
    pub fn subscribe_active(&self) -> watch::Receiver<Vec<MonthlyExpense>> {
        self.active.subscribe()
    }
}

fn sort_by_due_day(expenses: &mut [MonthlyExpense]) {
    expenses.sort_by(|a, b| {
        a.due_day
            .cmp(&b.due_day)
            .then_with(|| a.description.to_lowercase().cmp(&b.description.to_lowercase()))
            .then(a.id.cmp(&b.id))
    });
}
