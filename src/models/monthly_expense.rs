//! Recurring monthly obligations
//!
//! A `MonthlyExpense` is not a transaction. It never contributes to balances
//! or summaries; it is surfaced on its own as a list of obligations.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MonthlyExpenseId;
use super::money::Money;
use super::period::{Granularity, PeriodBucket};
use super::transaction::{validate_description, Category};
use crate::error::{FintraxError, FintraxResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyExpense {
    pub id: MonthlyExpenseId,
    pub amount: Money,
    pub description: String,
    pub category: Category,
    /// Day of the month the payment is due (1-31)
    pub due_day: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_paid_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl MonthlyExpense {
    /// Create and validate a new active obligation
    pub fn new(
        amount: Money,
        description: impl Into<String>,
        category: Category,
        due_day: u32,
        created_at: DateTime<Utc>,
    ) -> FintraxResult<Self> {
        let expense = Self {
            id: MonthlyExpenseId::new(),
            amount,
            description: description.into().trim().to_string(),
            category,
            due_day,
            is_active: true,
            created_at,
            last_paid_at: None,
        };
        expense.validate()?;
        Ok(expense)
    }

    pub fn validate(&self) -> FintraxResult<()> {
        if !self.amount.is_positive() {
            return Err(FintraxError::InvalidAmount(format!(
                "monthly expense amount must be greater than zero, got {}",
                self.amount.to_decimal_string()
            )));
        }
        validate_description(&self.description)?;
        if !(1..=31).contains(&self.due_day) {
            return Err(FintraxError::Validation(format!(
                "due day must be between 1 and 31, got {}",
                self.due_day
            )));
        }
        if self.category == Category::Income {
            return Err(FintraxError::Validation(
                "a monthly expense cannot use the Income category".into(),
            ));
        }
        Ok(())
    }

    /// Due day clamped to the length of the given month ("31" in April is the 30th)
    pub fn effective_due_day(&self, month: &PeriodBucket) -> u32 {
        let last_day = month.days().clamp(1, 31) as u32;
        self.due_day.min(last_day)
    }

    /// Whether a payment was recorded inside the given bucket
    pub fn is_paid_in(&self, bucket: &PeriodBucket) -> bool {
        self.last_paid_at.is_some_and(|paid| bucket.contains(paid))
    }

    /// Month bucket in which this obligation was last paid
    pub fn last_paid_month(&self) -> Option<String> {
        self.last_paid_at
            .map(|paid| format!("{:04}-{:02}", paid.year(), paid.month()))
    }

    /// Whether the obligation falls due inside a monthly bucket
    pub fn is_due_in(&self, bucket: &PeriodBucket) -> bool {
        self.is_active
            && bucket.granularity() == Granularity::Monthly
            && bucket.end() > self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_is_active() {
        let rent =
            MonthlyExpense::new(Money::from_cents(120_000), "Rent", Category::Housing, 1, created())
                .unwrap();
        assert!(rent.is_active);
        assert!(rent.last_paid_at.is_none());
    }

    #[test]
    fn test_due_day_range() {
        for day in [0, 32] {
            let result =
                MonthlyExpense::new(Money::from_cents(100), "Gym", Category::Healthcare, day, created());
            assert!(matches!(result, Err(FintraxError::Validation(_))));
        }
    }

    #[test]
    fn test_rejects_income_category_and_zero_amount() {
        assert!(
            MonthlyExpense::new(Money::from_cents(100), "Pay", Category::Income, 5, created())
                .is_err()
        );
        assert!(matches!(
            MonthlyExpense::new(Money::zero(), "Free", Category::Other, 5, created()),
            Err(FintraxError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_effective_due_day_clamps() {
        let expense =
            MonthlyExpense::new(Money::from_cents(100), "Loan", Category::Other, 31, created())
                .unwrap();
        let feb = PeriodBucket::parse(Granularity::Monthly, "2024-02").unwrap();
        let mar = PeriodBucket::parse(Granularity::Monthly, "2024-03").unwrap();
        assert_eq!(expense.effective_due_day(&feb), 29);
        assert_eq!(expense.effective_due_day(&mar), 31);
    }

    #[test]
    fn test_paid_in_bucket() {
        let mut expense =
            MonthlyExpense::new(Money::from_cents(100), "Phone", Category::Utilities, 10, created())
                .unwrap();
        let jan = PeriodBucket::parse(Granularity::Monthly, "2024-01").unwrap();
        let feb = jan.next().unwrap();
        expense.last_paid_at = Some(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap());
        assert!(expense.is_paid_in(&jan));
        assert!(!expense.is_paid_in(&feb));
        assert_eq!(expense.last_paid_month().as_deref(), Some("2024-01"));
    }
}
