//! Engine error types
//!
//! Only run-fatal conditions surface here. Per-record problems are
//! outcomes, reported through the run summary, never errors.

use carnet_directory::error::DirectoryError;
use thiserror::Error;

/// Error that aborts a whole reconciliation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The directory could not be reached before any record was processed.
    #[error("directory connectivity check failed: {0}")]
    Connectivity(#[source] DirectoryError),

    /// The pre-run snapshot of managed entries could not be fetched.
    #[error("failed to fetch the directory snapshot: {0}")]
    SnapshotFailed(#[source] DirectoryError),

    /// The per-list dynamic group could not be provisioned.
    #[error("group provisioning failed for list '{list}': {source}")]
    GroupProvisioning {
        list: String,
        #[source]
        source: DirectoryError,
    },
}

impl EngineError {
    /// Check if the underlying directory error is transient.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Connectivity(e) | EngineError::SnapshotFailed(e) => e.is_transient(),
            EngineError::GroupProvisioning { source, .. } => source.is_transient(),
        }
    }
}

/// Result type for engine runs.
pub type EngineResult<T> = Result<T, EngineError>;
