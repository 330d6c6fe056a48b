//! Progress store abstraction.

use async_trait::async_trait;
use std::path::Path;

use crate::document::ProgressDocument;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The resolved progress file does not exist
    #[error("No saved progress found at: {0}")]
    NotFound(String),

    /// Nothing to resume from
    #[error("No progress file found. Provide a lab name or a progress file.")]
    NoProgressFile,
}

/// Where a session snapshot is kept.
///
/// Exactly one tracker is expected to own a location at a time; nothing
/// here guards against concurrent writers.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Write a snapshot, replacing any previous one.
    async fn save(&self, document: &ProgressDocument) -> Result<()>;

    /// Read and migrate the snapshot.
    async fn load(&self) -> Result<ProgressDocument>;

    /// Whether a snapshot exists.
    async fn exists(&self) -> bool;

    /// Location shown to users.
    fn location(&self) -> &Path;
}
