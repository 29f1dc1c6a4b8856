//! Genre-based "similar books" relation.
//!
//! Two distinct books are similar iff they share a genre. The relation is
//! stored as directed edges and kept symmetric by the [`SimilarityEngine`],
//! which checks each direction before writing it. [`RecomputeJob`] re-derives
//! the whole edge set inside one transaction.

mod engine;
mod job;
mod sqlite;
mod types;

pub use engine::SimilarityEngine;
pub use job::RecomputeJob;
pub use types::*;

use crate::catalog::BookId;
use crate::store::StoreError;

/// Storage for directed similarity edges.
pub trait SimilarityStore {
    /// Whether the edge `subject_id -> candidate_id` exists.
    fn exists(&self, subject_id: BookId, candidate_id: BookId) -> Result<bool, StoreError>;

    /// Add the edge `subject_id -> candidate_id`.
    ///
    /// Callers check [`exists`](Self::exists) first. Adding an edge that is
    /// already present fails with [`StoreError::DuplicateEdge`].
    fn add(&self, subject_id: BookId, candidate_id: BookId) -> Result<(), StoreError>;

    /// Remove the edge `subject_id -> candidate_id`.
    ///
    /// Removing a missing edge is not an error; returns whether a row was
    /// deleted.
    fn remove(&self, subject_id: BookId, candidate_id: BookId) -> Result<bool, StoreError>;

    /// Books `subject_id` is similar to, in ascending id order.
    fn list_similar_to(&self, subject_id: BookId) -> Result<Vec<BookId>, StoreError>;

    /// Remove every edge mentioning `book_id`, in either direction.
    fn remove_all_for(&self, book_id: BookId) -> Result<usize, StoreError>;

    /// Remove all edges.
    fn clear(&self) -> Result<usize, StoreError>;

    /// Number of stored edges.
    fn count(&self) -> Result<u64, StoreError>;
}
