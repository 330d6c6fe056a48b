//! Progress tracker errors.

use labtrack_storage::StorageError;

/// Error type for tracker operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors surfaced by the tracker. Unknown step names are not errors.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Saving, loading or resolving the progress file failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding an export failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
