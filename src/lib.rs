//! fintrax - personal-finance tracking with a live aggregation engine
//!
//! Transactions are recorded in a ledger; balances, period summaries,
//! category breakdowns and trends are derived from it and kept current as
//! the ledger changes. Every derived figure can be rebuilt from the ledger
//! alone.
//!
//! # Architecture
//!
//! - `config`: data directory resolution and settings
//! - `error`: error taxonomy
//! - `logging`: tracing subscriber setup
//! - `models`: money, periods, transactions and aggregate value types
//! - `storage`: JSON-backed ledger, recurring expenses and balance snapshots
//! - `services`: the aggregate components and write paths
//! - `engine`: component wiring and change workers
//! - `export`: CSV/JSON/YAML export
//! - `display`, `cli`: the command-line front end
//!
//! # Example
//!
//! ```rust,ignore
//! use fintrax::config::{paths::FintraxPaths, settings::Settings};
//! use fintrax::engine::Engine;
//! use fintrax::services::PeriodCalendar;
//! use fintrax::storage::Storage;
//!
//! let paths = FintraxPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::new(paths, &settings)?;
//! let engine = Engine::open(&storage, PeriodCalendar::system(), &settings).await?;
//! println!("{}", engine.balance().current_balance().net_balance);
//! ```

pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use engine::Engine;
pub use error::{FintraxError, FintraxResult};
