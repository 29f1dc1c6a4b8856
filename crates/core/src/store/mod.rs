//! Storage plumbing shared by the catalog and similarity stores.
//!
//! Both stores live in the same database, so every write path goes through a
//! [`Transactional`] backend that hands out a [`UnitOfWork`]: a pair of store
//! views enlisted in one transaction. Returning `Err` from the work closure
//! rolls the whole unit back.

mod sqlite;

pub(crate) use sqlite::map_sqlite_error;
pub use sqlite::{SqliteLibrary, SqliteSession};

use thiserror::Error;

use crate::catalog::{BookId, CatalogStore};
use crate::similarity::SimilarityStore;

/// Errors surfaced by the catalog and similarity stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Similarity edge {subject_id} -> {similar_id} already exists")]
    DuplicateEdge { subject_id: BookId, similar_id: BookId },
}

/// Store views enlisted in a single transaction.
pub trait UnitOfWork {
    /// Catalog view (books and genres).
    fn catalog(&self) -> &dyn CatalogStore;

    /// Similarity edge view.
    fn similarity(&self) -> &dyn SimilarityStore;
}

/// A storage backend able to run work atomically.
pub trait Transactional: Send + Sync {
    /// Run `work` inside one transaction.
    ///
    /// Commits when `work` returns `Ok`, rolls back when it returns `Err`.
    /// Failures to begin or commit are converted into `E` through
    /// `From<StoreError>`.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn UnitOfWork) -> Result<T, E>,
        E: From<StoreError>;
}
