use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for shortfall_types::ShortfallError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidInput(msg) => shortfall_types::ShortfallError::InvalidInput(msg),
            other => shortfall_types::ShortfallError::Storage(other.to_string()),
        }
    }
}
