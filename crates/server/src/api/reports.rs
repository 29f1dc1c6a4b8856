//! Report API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use bookshelf_core::{GenreId, GenreReport};

use super::handlers::{bad_request, with_library, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenreReportParams {
    /// Comma-separated genre ids; all genres when absent or empty.
    #[serde(default)]
    pub ids: Option<String>,
}

fn parse_ids(raw: Option<&str>) -> Result<Vec<GenreId>, String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| format!("Invalid genre id: {}", s)))
        .collect()
}

/// GET /api/v1/reports/genres?ids=1,2
pub async fn genre_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GenreReportParams>,
) -> Result<Json<GenreReport>, ApiError> {
    let ids = parse_ids(params.ids.as_deref()).map_err(bad_request)?;
    with_library(&state, move |library| library.genre_report(&ids))
        .await
        .map(Json)
}
