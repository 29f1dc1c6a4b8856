use thiserror::Error;

use crate::catalog::ValidationError;
use crate::similarity::{BatchError, EngineError};
use crate::store::StoreError;

/// Errors returned by [`Library`](super::Library) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("Similarity sync failed: {0}")]
    Sync(#[from] EngineError),

    #[error(transparent)]
    Recompute(#[from] BatchError),
}

impl From<StoreError> for LibraryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => LibraryError::NotFound(what),
            StoreError::Constraint(msg) => LibraryError::Conflict(msg),
            other => LibraryError::Store(other),
        }
    }
}
