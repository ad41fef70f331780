//! Tickerplot - NSE market data importer
//!
//! Downloads the NSE reference feeds (listed equities, symbol changes) and
//! daily price files, parses them into typed records and persists them into
//! a small set of SQLite tables.

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod import;
pub mod models;
pub mod nse;
pub mod telemetry;

pub use error::{AppError, Result};
