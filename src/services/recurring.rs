//! Recurring obligations service
//!
//! Business logic over the monthly expense store. Obligations are surfaced
//! on their own and never folded into balances or summaries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::info;

use crate::error::{FintraxError, FintraxResult};
use crate::models::{Category, Granularity, Money, MonthlyExpense, MonthlyExpenseId, PeriodBucket};
use crate::storage::MonthlyExpenseStore;

use super::period::PeriodCalendar;

/// Input for creating a new monthly expense
#[derive(Debug, Clone)]
pub struct CreateMonthlyExpenseInput {
    pub amount: Money,
    pub description: String,
    pub category: Category,
    pub due_day: u32,
}

/// Service for recurring obligations
pub struct RecurringService {
    store: Arc<MonthlyExpenseStore>,
    calendar: PeriodCalendar,
}

impl RecurringService {
    pub fn new(store: Arc<MonthlyExpenseStore>, calendar: PeriodCalendar) -> Self {
        Self { store, calendar }
    }

    pub fn add(&self, input: CreateMonthlyExpenseInput) -> FintraxResult<MonthlyExpense> {
        let expense = MonthlyExpense::new(
            input.amount,
            input.description,
            input.category,
            input.due_day,
            self.calendar.now(),
        )?;
        self.store.insert(expense.clone())?;
        info!(id = %expense.id, due_day = expense.due_day, "monthly expense added");
        Ok(expense)
    }

    pub fn get(&self, id: MonthlyExpenseId) -> FintraxResult<Option<MonthlyExpense>> {
        self.store.get(id)
    }

    /// Find by full id or by the short id prefix shown in listings
    pub fn find(&self, identifier: &str) -> FintraxResult<Option<MonthlyExpense>> {
        if let Ok(id) = identifier.parse::<MonthlyExpenseId>() {
            return self.store.get(id);
        }
        let mut matches: Vec<MonthlyExpense> = self
            .store
            .list_all()?
            .into_iter()
            .filter(|e| e.id.matches_short(identifier))
            .collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(FintraxError::Validation(format!(
                "'{}' matches more than one monthly expense",
                identifier
            ))),
        }
    }

    fn require(&self, id: MonthlyExpenseId) -> FintraxResult<MonthlyExpense> {
        self.store
            .get(id)?
            .ok_or_else(|| FintraxError::monthly_expense_not_found(id.to_string()))
    }

    /// Stop an obligation from recurring; history is kept
    pub fn deactivate(&self, id: MonthlyExpenseId) -> FintraxResult<MonthlyExpense> {
        let mut expense = self.require(id)?;
        if !expense.is_active {
            return Ok(expense);
        }
        expense.is_active = false;
        self.store.update(expense.clone())?;
        info!(id = %expense.id, "monthly expense deactivated");
        Ok(expense)
    }

    /// Record a payment at `paid_at` (now when `None`)
    pub fn mark_paid(
        &self,
        id: MonthlyExpenseId,
        paid_at: Option<DateTime<Utc>>,
    ) -> FintraxResult<MonthlyExpense> {
        let mut expense = self.require(id)?;
        expense.last_paid_at = Some(paid_at.unwrap_or_else(|| self.calendar.now()));
        self.store.update(expense.clone())?;
        info!(id = %expense.id, "monthly expense marked paid");
        Ok(expense)
    }

    pub fn list_active(&self) -> FintraxResult<Vec<MonthlyExpense>> {
        self.store.list_active()
    }

    pub fn list_all(&self) -> FintraxResult<Vec<MonthlyExpense>> {
        self.store.list_all()
    }

    /// Active list, due day ascending; current value available immediately
    pub fn watch_active(&self) -> watch::Receiver<Vec<MonthlyExpense>> {
        self.store.subscribe_active()
    }

    /// Active obligations falling due in a monthly bucket and not yet paid in it
    pub fn obligations_for(&self, bucket: PeriodBucket) -> FintraxResult<Vec<MonthlyExpense>> {
        if bucket.granularity() != Granularity::Monthly {
            return Err(FintraxError::InvalidPeriod(format!(
                "obligations are monthly, got a {} bucket",
                bucket.granularity()
            )));
        }
        Ok(self
            .store
            .list_active()?
            .into_iter()
            .filter(|e| e.is_due_in(&bucket) && !e.is_paid_in(&bucket))
            .collect())
    }

    /// Unpaid obligations of the current month
    pub fn current_obligations(&self) -> FintraxResult<Vec<MonthlyExpense>> {
        self.obligations_for(self.calendar.current(Granularity::Monthly)?)
    }

    /// Sum of what is still owed in a monthly bucket
    pub fn outstanding_total(&self, bucket: PeriodBucket) -> FintraxResult<Money> {
        Money::checked_sum(self.obligations_for(bucket)?.iter().map(|e| e.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::period::FixedClock;
    use chrono::TimeZone;

    fn service() -> RecurringService {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        RecurringService::new(
            Arc::new(MonthlyExpenseStore::in_memory()),
            PeriodCalendar::new(Arc::new(FixedClock::new(now))),
        )
    }

    fn input(description: &str, cents: i64, due_day: u32) -> CreateMonthlyExpenseInput {
        CreateMonthlyExpenseInput {
            amount: Money::from_cents(cents),
            description: description.to_string(),
            category: Category::Housing,
            due_day,
        }
    }

    #[test]
    fn test_obligations_exclude_paid_and_inactive() {
        let service = service();
        let rent = service.add(input("Rent", 120_000, 1)).unwrap();
        let internet = service.add(input("Internet", 6_000, 20)).unwrap();
        let gym = service.add(input("Gym", 3_000, 10)).unwrap();

        service.mark_paid(rent.id, None).unwrap();
        service.deactivate(gym.id).unwrap();

        let march = service.calendar.current(Granularity::Monthly).unwrap();
        let owed = service.obligations_for(march).unwrap();
        assert_eq!(owed.len(), 1);
        assert_eq!(owed[0].id, internet.id);
        assert_eq!(service.outstanding_total(march).unwrap().cents(), 6_000);

        // rent falls due again next month
        let april = march.next().unwrap();
        assert_eq!(service.obligations_for(april).unwrap().len(), 2);
    }

    #[test]
    fn test_not_due_before_creation() {
        let service = service();
        service.add(input("Rent", 120_000, 1)).unwrap();
        let january = PeriodBucket::parse(Granularity::Monthly, "2024-01").unwrap();
        assert!(service.obligations_for(january).unwrap().is_empty());
    }

    #[test]
    fn test_obligations_require_monthly_bucket() {
        let service = service();
        let week = service.calendar.current(Granularity::Weekly).unwrap();
        assert!(matches!(
            service.obligations_for(week),
            Err(FintraxError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_deactivate_missing_is_not_found() {
        let service = service();
        assert!(service.deactivate(MonthlyExpenseId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_watch_active_ordered_by_due_day() {
        let service = service();
        let rx = service.watch_active();
        service.add(input("Internet", 6_000, 20)).unwrap();
        service.add(input("Rent", 120_000, 1)).unwrap();
        let days: Vec<u32> = rx.borrow().iter().map(|e| e.due_day).collect();
        assert_eq!(days, vec![1, 20]);
    }

    #[test]
    fn test_find_by_short_id() {
        let service = service();
        let rent = service.add(input("Rent", 120_000, 1)).unwrap();
        let short = rent.id.as_uuid().to_string()[..8].to_string();
        assert_eq!(service.find(&short).unwrap().map(|e| e.id), Some(rent.id));
        assert_eq!(service.find(&rent.id.to_string()).unwrap().map(|e| e.id), Some(rent.id));
    }
}
