//! Stage-level error taxonomy for the pipeline
//!
//! Row-level conditions (identifier not found, rejected update) are not
//! errors; they are reported per row as [`RowOutcome`](super::load::RowOutcome)
//! and never abort the run.

use std::path::PathBuf;

#[derive(Debug)]
pub enum EtlError {
    /// Source file missing or unreadable; aborts the run before any
    /// store interaction
    SourceUnavailable { path: PathBuf, message: String },
    /// Could not establish a store connection; the load stage is abandoned
    /// and already-computed data is discarded
    StoreConnectionFailed { message: String },
    /// The final commit of the batch failed after all row-level work
    /// was attempted
    BatchCommitFailed { message: String },
}

impl std::fmt::Display for EtlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EtlError::SourceUnavailable { path, message } => {
                write!(f, "source file unavailable: {}: {}", path.display(), message)
            }
            EtlError::StoreConnectionFailed { message } => {
                write!(f, "could not connect to the database: {}", message)
            }
            EtlError::BatchCommitFailed { message } => {
                write!(f, "failed to commit batch: {}", message)
            }
        }
    }
}

impl std::error::Error for EtlError {}
