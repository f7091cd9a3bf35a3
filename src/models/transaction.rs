//! Transaction model
//!
//! A transaction carries a strictly positive amount; its direction (income
//! or expense) is encoded solely by [`TransactionType`]. The `Income`
//! category is reserved for income transactions and vice versa, enforced by
//! [`Transaction::validate`] before anything reaches the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::TransactionId;
use super::money::Money;
use crate::error::{FintraxError, FintraxResult};

/// Maximum description length, in characters
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Fixed category enumeration
///
/// Declaration order is the tie-break order used by category analytics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Housing,
    Transportation,
    Food,
    Utilities,
    Healthcare,
    Entertainment,
    Savings,
    Income,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Housing,
        Category::Transportation,
        Category::Food,
        Category::Utilities,
        Category::Healthcare,
        Category::Entertainment,
        Category::Savings,
        Category::Income,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Housing => "Housing",
            Self::Transportation => "Transportation",
            Self::Food => "Food",
            Self::Utilities => "Utilities",
            Self::Healthcare => "Healthcare",
            Self::Entertainment => "Entertainment",
            Self::Savings => "Savings",
            Self::Income => "Income",
            Self::Other => "Other",
        }
    }

    /// Chart colour (hex) assigned to this category
    pub fn color(&self) -> &'static str {
        match self {
            Self::Housing => "#3F51B5",
            Self::Transportation => "#009688",
            Self::Food => "#FF9800",
            Self::Utilities => "#607D8B",
            Self::Healthcare => "#E91E63",
            Self::Entertainment => "#9C27B0",
            Self::Savings => "#4CAF50",
            Self::Income => "#2E7D32",
            Self::Other => "#9E9E9E",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = FintraxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FintraxError::Validation(format!("unknown category '{}'", wanted)))
    }
}

/// Direction of a transaction's impact on the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = FintraxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(FintraxError::Validation(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// Recurrence template marker; the engine never expands these
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrencePeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for RecurrencePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for RecurrencePeriod {
    type Err = FintraxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(FintraxError::Validation(format!(
                "unknown recurrence '{}'",
                other
            ))),
        }
    }
}

/// A financial transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier, stable for the transaction's lifetime
    pub id: TransactionId,

    /// Magnitude, always greater than zero
    pub amount: Money,

    pub description: String,

    pub category: Category,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    /// When the transaction happened; drives bucketing and ordering
    pub occurred_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrencePeriod>,
}

impl Transaction {
    /// Create and validate a new transaction with a fresh id
    pub fn new(
        transaction_type: TransactionType,
        amount: Money,
        description: impl Into<String>,
        category: Category,
        occurred_at: DateTime<Utc>,
    ) -> FintraxResult<Self> {
        let txn = Self {
            id: TransactionId::new(),
            amount,
            description: description.into().trim().to_string(),
            category,
            transaction_type,
            occurred_at,
            recurrence: None,
        };
        txn.validate()?;
        Ok(txn)
    }

    /// Income transaction in the reserved `Income` category
    pub fn income(
        amount: Money,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> FintraxResult<Self> {
        Self::new(
            TransactionType::Income,
            amount,
            description,
            Category::Income,
            occurred_at,
        )
    }

    pub fn expense(
        amount: Money,
        description: impl Into<String>,
        category: Category,
        occurred_at: DateTime<Utc>,
    ) -> FintraxResult<Self> {
        Self::new(
            TransactionType::Expense,
            amount,
            description,
            category,
            occurred_at,
        )
    }

    /// Mark this transaction as a recurrence template
    pub fn with_recurrence(mut self, recurrence: RecurrencePeriod) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn is_income(&self) -> bool {
        self.transaction_type == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    /// Amount with the sign implied by the transaction type
    pub fn signed_amount(&self) -> Money {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    /// Validate the transaction
    pub fn validate(&self) -> FintraxResult<()> {
        if !self.amount.is_positive() {
            return Err(FintraxError::InvalidAmount(format!(
                "transaction amount must be greater than zero, got {}",
                self.amount.to_decimal_string()
            )));
        }

        validate_description(&self.description)?;

        match (self.transaction_type, self.category) {
            (TransactionType::Income, Category::Income) => Ok(()),
            (TransactionType::Expense, Category::Income) => Err(FintraxError::Validation(
                "the Income category is reserved for income transactions".into(),
            )),
            (TransactionType::Income, other) => Err(FintraxError::Validation(format!(
                "income transactions must use the Income category, got {}",
                other
            ))),
            (TransactionType::Expense, _) => Ok(()),
        }
    }
}

/// Shared description rule: non-blank, at most 255 characters
pub(crate) fn validate_description(description: &str) -> FintraxResult<()> {
    if description.trim().is_empty() {
        return Err(FintraxError::Validation("description cannot be blank".into()));
    }
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(FintraxError::Validation(format!(
            "description is {} characters, the limit is {}",
            len, MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} ({})",
            self.occurred_at.format("%Y-%m-%d"),
            self.transaction_type,
            self.signed_amount(),
            self.description,
            self.category
        )
    }
}
