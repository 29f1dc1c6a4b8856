//! Genre API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use bookshelf_core::{Genre, GenreId};

use super::handlers::{with_library, ApiError, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenreRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/genres
pub async fn list_genres(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenreListResponse>, ApiError> {
    let genres = with_library(&state, |library| library.genres()).await?;
    let total = genres.len();
    Ok(Json(GenreListResponse { genres, total }))
}

/// POST /api/v1/genres
pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenreRequest>,
) -> Result<(StatusCode, Json<Genre>), ApiError> {
    let genre = with_library(&state, move |library| library.create_genre(&request.name)).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

/// GET /api/v1/genres/{id}
pub async fn get_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GenreId>,
) -> Result<Json<Genre>, ApiError> {
    with_library(&state, move |library| library.genre(id))
        .await
        .map(Json)
}

/// PUT /api/v1/genres/{id}
pub async fn rename_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GenreId>,
    Json(request): Json<GenreRequest>,
) -> Result<Json<Genre>, ApiError> {
    with_library(&state, move |library| library.rename_genre(id, &request.name))
        .await
        .map(Json)
}

/// DELETE /api/v1/genres/{id}
///
/// Fails with 409 while books still belong to the genre.
pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GenreId>,
) -> Result<Json<SuccessResponse>, ApiError> {
    with_library(&state, move |library| library.delete_genre(id)).await?;
    Ok(Json(SuccessResponse {
        message: format!("Genre {} deleted", id),
    }))
}
