//! Similarity API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use bookshelf_core::{Book, BookId, RecomputeOutcome};

use super::handlers::{with_library, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SimilarBooksResponse {
    pub book_id: BookId,
    pub similar: Vec<Book>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct UnlinkResponse {
    pub edges_removed: usize,
}

/// GET /api/v1/books/{id}/similar
pub async fn list_similar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookId>,
) -> Result<Json<SimilarBooksResponse>, ApiError> {
    let similar = with_library(&state, move |library| library.similar_books(id)).await?;
    let total = similar.len();
    Ok(Json(SimilarBooksResponse {
        book_id: id,
        similar,
        total,
    }))
}

/// DELETE /api/v1/books/{id}/similar/{other_id}
///
/// Removes the pair in both directions.
pub async fn unlink(
    State(state): State<Arc<AppState>>,
    Path((id, other_id)): Path<(BookId, BookId)>,
) -> Result<Json<UnlinkResponse>, ApiError> {
    let edges_removed =
        with_library(&state, move |library| library.unlink(id, other_id)).await?;
    Ok(Json(UnlinkResponse { edges_removed }))
}

/// POST /api/v1/similarity/recompute
///
/// Re-derive every edge. The store lock is held for the whole job.
pub async fn recompute(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecomputeOutcome>, ApiError> {
    with_library(&state, |library| library.recompute())
        .await
        .map(Json)
}
