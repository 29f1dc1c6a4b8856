//! Book API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use chrono::NaiveDate;

use bookshelf_core::{Book, BookId, BookQuery, GenreId, NewBook};

use super::handlers::{with_library, ApiError, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BookQueryParams {
    /// Free text matched against title, author, publisher, ISBN, genre,
    /// tag and publication date.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub genre_id: Option<GenreId>,
    /// Per-field filters; every given one must match.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Exact date, `YYYY-MM-DD`.
    #[serde(default)]
    pub published_on: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    100
}

impl From<BookQueryParams> for BookQuery {
    fn from(params: BookQueryParams) -> Self {
        BookQuery {
            text: params.q,
            genre_id: params.genre_id,
            title: params.title,
            author: params.author,
            isbn: params.isbn,
            genre_name: params.genre,
            published_on: params.published_on,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookListResponse {
    pub books: Vec<Book>,
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/books
///
/// Search the catalog, or list it when no filter is given.
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BookQueryParams>,
) -> Result<Json<BookListResponse>, ApiError> {
    let query = BookQuery::from(params);
    let books = with_library(&state, move |library| library.search(&query)).await?;
    let total = books.len();
    Ok(Json(BookListResponse { books, total }))
}

/// POST /api/v1/books
///
/// Add a book. Similar books are linked in the same transaction.
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = with_library(&state, move |library| library.add_book(&request)).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /api/v1/books/{id}
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, ApiError> {
    with_library(&state, move |library| library.book(id))
        .await
        .map(Json)
}

/// GET /api/v1/books/isbn/{isbn}
pub async fn get_book_by_isbn(
    State(state): State<Arc<AppState>>,
    Path(isbn): Path<String>,
) -> Result<Json<Book>, ApiError> {
    with_library(&state, move |library| library.book_by_isbn(&isbn))
        .await
        .map(Json)
}

/// PUT /api/v1/books/{id}
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookId>,
    Json(request): Json<NewBook>,
) -> Result<Json<Book>, ApiError> {
    with_library(&state, move |library| library.update_book(id, &request))
        .await
        .map(Json)
}

/// DELETE /api/v1/books/{id}
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookId>,
) -> Result<Json<SuccessResponse>, ApiError> {
    with_library(&state, move |library| library.delete_book(id)).await?;
    Ok(Json(SuccessResponse {
        message: format!("Book {} deleted", id),
    }))
}
