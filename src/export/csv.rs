//! CSV export
//!
//! Writes the ledger, and category breakdowns, in a spreadsheet-friendly
//! layout. Amounts are plain decimals without a currency symbol.

use std::io::Write;

use serde::Serialize;

use crate::error::{FintraxError, FintraxResult};
use crate::models::{CategoryBreakdown, Transaction};

#[derive(Serialize)]
struct TransactionRow<'a> {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Occurred At")]
    occurred_at: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Category")]
    category: &'static str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Signed Amount")]
    signed_amount: String,
}

#[derive(Serialize)]
struct BreakdownRow {
    #[serde(rename = "Category")]
    category: &'static str,
    #[serde(rename = "Total")]
    total: String,
    #[serde(rename = "Transactions")]
    transactions: usize,
    #[serde(rename = "Share")]
    share: String,
}

fn export_error(err: impl std::fmt::Display) -> FintraxError {
    FintraxError::Export(err.to_string())
}

/// Export transactions to CSV, in the order given
pub fn export_transactions_csv<W: Write>(
    transactions: &[Transaction],
    writer: W,
) -> FintraxResult<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    for txn in transactions {
        csv.serialize(TransactionRow {
            id: txn.id.as_uuid().to_string(),
            occurred_at: txn.occurred_at.to_rfc3339(),
            kind: txn.transaction_type.to_string(),
            category: txn.category.label(),
            description: &txn.description,
            amount: txn.amount.to_decimal_string(),
            signed_amount: txn.signed_amount().to_decimal_string(),
        })
        .map_err(export_error)?;
    }
    csv.flush().map_err(export_error)?;
    Ok(())
}

/// Export a category breakdown to CSV
pub fn export_breakdown_csv<W: Write>(
    breakdown: &[CategoryBreakdown],
    writer: W,
) -> FintraxResult<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    for entry in breakdown {
        csv.serialize(BreakdownRow {
            category: entry.category.label(),
            total: entry.total_amount.to_decimal_string(),
            transactions: entry.transaction_count,
            share: entry.percentage.to_string(),
        })
        .map_err(export_error)?;
    }
    csv.flush().map_err(export_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Money, Percentage, TransactionType};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_export_transactions() {
        let txn = Transaction::new(
            TransactionType::Expense,
            Money::from_cents(1_205),
            "Lunch, with \"friends\"",
            Category::Food,
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        )
        .unwrap();

        let mut output = Vec::new();
        export_transactions_csv(&[txn], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Occurred At,Type,Category,Description,Amount,Signed Amount")
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"Lunch, with \"\"friends\"\"\""));
        assert!(row.ends_with(",12.05,-12.05"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_export_breakdown() {
        let breakdown = vec![CategoryBreakdown {
            category: Category::Housing,
            total_amount: Money::from_cents(120_000),
            transaction_count: 1,
            percentage: Percentage::HUNDRED,
        }];
        let mut output = Vec::new();
        export_breakdown_csv(&breakdown, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Housing,1200.00,1,100.00%"));
    }
}
