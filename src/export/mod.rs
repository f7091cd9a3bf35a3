//! Export module for fintrax
//!
//! - CSV: the ledger and category breakdowns (spreadsheet-compatible)
//! - JSON: machine-readable report bundles
//! - YAML: human-readable report bundles

pub mod csv;
pub mod json;
pub mod yaml;

pub use csv::{export_breakdown_csv, export_transactions_csv};
pub use json::{export_report_json, import_report_json, ReportBundle, REPORT_SCHEMA_VERSION};
pub use yaml::{export_report_yaml, import_report_yaml};
