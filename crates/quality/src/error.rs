//! Validator errors.

/// Result type for validator operations.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Errors surfaced by the validator. Failing checks are outcomes, not errors.
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    /// Writing a report failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
