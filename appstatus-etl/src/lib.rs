//! Spreadsheet-to-database reconciliation for application status records
//!
//! The pipeline reads an Excel export, renames its columns to the
//! canonical schema, and reconciles each row against the persisted table:
//! present values overwrite, blanks never erase.

pub mod config;
pub mod etl;

pub use config::StoreConfig;
pub use etl::{EtlError, RunSummary, run_pipeline};
