//! Terminal display formatting
//!
//! Renders engine output as tables for the command line.

pub mod report;
pub mod transaction;

pub use report::{
    format_balance, format_balance_history, format_breakdown, format_obligations,
    format_summary, format_trend, format_year_over_year,
};
pub use transaction::{format_transaction_details, format_transaction_table};

use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Render rows with the shared table style, or `empty` when there are none
pub(crate) fn render_table<T: Tabled>(rows: Vec<T>, empty: &str) -> String {
    if rows.is_empty() {
        return format!("{}\n", empty);
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n", table)
}

/// Truncate a string to a maximum length, ending in ".." when cut
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 2 {
        s.chars().take(max_len).collect()
    } else {
        format!("{}..", s.chars().take(max_len - 2).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello ..");
        assert_eq!(truncate("Café au lait", 6), "Café..");
    }
}
