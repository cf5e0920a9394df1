//! Error types shared across the workspace

use thiserror::Error;

use crate::request::RequestStatus;

/// Result alias used throughout the workflow crates
pub type ShortfallResult<T> = Result<T, ShortfallError>;

/// Domain errors raised by the workflow engine and service layer
#[derive(Debug, Error)]
pub enum ShortfallError {
    /// The requested event has no edge from the current status. The
    /// stored record is left untouched.
    #[error("invalid transition: no '{event}' edge from status '{from}'")]
    InvalidTransition { from: RequestStatus, event: String },

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Product code missing from the product master
    #[error("unknown product code '{0}'")]
    UnknownProduct(String),

    /// Malformed or out-of-range input
    #[error("{0}")]
    InvalidInput(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),
}
