//! Types for similarity maintenance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{BookId, GenreId};
use crate::store::StoreError;

/// Result of an incremental sync for one book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Other books sharing the genre.
    pub candidates: usize,
    /// Edges actually inserted (0 when everything already existed).
    pub edges_written: usize,
}

/// Result of an engine pass over a set of books.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub books_processed: usize,
    /// Number of distinct genres among the processed books.
    pub genre_groups: usize,
    pub edges_written: usize,
}

/// How a recompute treats edges that already exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeMode {
    /// Clear the edge set, then derive it again from current genres.
    #[default]
    Rebuild,
    /// Keep existing edges and only add missing ones.
    Append,
}

/// Terminal status of a recompute job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeStatus {
    /// Edges were derived for a non-empty catalog.
    Completed,
    /// The catalog had no books; nothing was computed.
    EmptyCatalog,
}

/// Outcome of a committed recompute job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeOutcome {
    pub status: RecomputeStatus,
    pub mode: RecomputeMode,
    pub books_processed: usize,
    /// Edges inserted. Informational: edges that already existed are skipped.
    pub edges_written: usize,
    /// Edges cleared before the rebuild.
    pub edges_removed: usize,
    pub duration_ms: u64,
}

/// Errors from the similarity engine, with the context being processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Failed to load catalog: {source}")]
    LoadCatalog {
        #[source]
        source: StoreError,
    },

    #[error("Failed to load books of genre {genre_id}: {source}")]
    LoadCandidates {
        genre_id: GenreId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to write similarity edge {subject_id} -> {similar_id}: {source}")]
    WriteEdge {
        subject_id: BookId,
        similar_id: BookId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to clear similarity edges: {source}")]
    ClearEdges {
        #[source]
        source: StoreError,
    },
}

/// A recompute job that was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("Recompute rolled back: {0}")]
    Engine(#[from] EngineError),

    #[error("Recompute transaction failed: {0}")]
    Transaction(#[from] StoreError),
}
