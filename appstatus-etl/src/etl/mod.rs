//! Spreadsheet-to-database reconciliation pipeline
//!
//! Three stages compose linearly: extract the spreadsheet into a raw
//! table, transform it into the canonical schema, then reconcile each
//! row against the persisted table and apply the minimal field-level
//! updates.

pub mod encode;
pub mod error;
pub mod extract;
pub mod load;
pub mod transform;
pub mod types;

pub use encode::{BindValue, encode};
pub use error::EtlError;
pub use extract::extract;
pub use load::{Loader, RowOutcome, RunSummary};
pub use transform::transform;
pub use types::{CanonicalTable, Field, IncomingRow, SourceTable, Value};

use std::path::Path;

use anyhow::Result;
use log::info;

use crate::config::StoreConfig;

/// Run the full pipeline against one source file.
///
/// Stage-level failures (unreadable source, no store connection, failed
/// batch commit) propagate; row-level conditions are summarized.
pub async fn run_pipeline(path: &Path, config: &StoreConfig) -> Result<RunSummary> {
    let source = extract(path)?;
    let canonical = transform(&source);

    let loader = Loader::connect(config).await?;
    let result = loader.load(&canonical).await;
    loader.close().await;

    let summary = result?;
    info!("Data loaded successfully: {}", summary);
    Ok(summary)
}
