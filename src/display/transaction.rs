//! Transaction display formatting

use tabled::Tabled;

use super::{render_table, truncate};
use crate::models::Transaction;

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

/// Transactions as a table, in the order given
pub fn format_transaction_table(transactions: &[Transaction], symbol: &str) -> String {
    let rows = transactions
        .iter()
        .map(|txn| TransactionRow {
            id: txn.id.to_string(),
            date: txn.occurred_at.format("%Y-%m-%d %H:%M").to_string(),
            kind: txn.transaction_type.to_string(),
            category: txn.category.to_string(),
            description: truncate(&txn.description, 32),
            amount: txn.signed_amount().format_with_symbol(symbol),
        })
        .collect();
    render_table(rows, "No transactions found.")
}

pub fn format_transaction_details(txn: &Transaction, symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Transaction: {}\n", txn.id));
    output.push_str(&format!("Occurred:    {}\n", txn.occurred_at.to_rfc3339()));
    output.push_str(&format!("Type:        {}\n", txn.transaction_type));
    output.push_str(&format!("Amount:      {}\n", txn.amount.format_with_symbol(symbol)));
    output.push_str(&format!("Category:    {}\n", txn.category));
    output.push_str(&format!("Description: {}\n", txn.description));
    if let Some(recurrence) = txn.recurrence {
        output.push_str(&format!("Recurs:      {}\n", recurrence));
    }
    output
}
