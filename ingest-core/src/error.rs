//! # Ingest Error Types
//!
//! Central error taxonomy for the ingestion pipeline, aggregating errors
//! from configuration, the store, and vendor clients behind one enum so
//! `main` has a single place to decide the process exit code.

use thiserror::Error;

/// Central error type for the ingestion pipeline.
///
/// A fatal init failure (`Config`) should abort the process with a
/// non-zero exit; every other variant is caught at the task-worker
/// boundary and converted into a per-security status code instead of
/// propagating (`spec.md` §7).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("vendor error: {0}")]
    Vendor(String),

    #[error("task join error: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(format!("{value:?}"))
    }
}
