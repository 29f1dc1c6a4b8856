use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use bookshelf_core::{Config, Library, LibraryError, LibraryStats, SqliteLibrary};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Error half of every fallible handler.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a library error onto an HTTP status and JSON body.
pub fn api_error(err: LibraryError) -> ApiError {
    let status = match &err {
        LibraryError::Validation(_) => StatusCode::BAD_REQUEST,
        LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
        LibraryError::Conflict(_) => StatusCode::CONFLICT,
        LibraryError::Store(_) | LibraryError::Sync(_) | LibraryError::Recompute(_) => {
            error!(error = %err, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// A 400 for malformed request parameters.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Run a library call on the blocking pool.
///
/// The store lock is held for a whole recompute; waiting for it must not
/// park a runtime worker.
pub async fn with_library<T, F>(state: &Arc<AppState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&Library<SqliteLibrary>) -> Result<T, LibraryError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || work(state.library())).await {
        Ok(result) => result.map_err(api_error),
        Err(e) => {
            error!(error = %e, "Library task failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Library task failed: {}", e),
                }),
            ))
        }
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

/// GET /api/v1/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LibraryStats>, ApiError> {
    with_library(&state, |library| library.stats())
        .await
        .map(Json)
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let collector = Arc::clone(&state);
    let collected =
        tokio::task::spawn_blocking(move || collect_dynamic_metrics(&collector)).await;
    if let Err(e) = collected {
        error!(error = %e, "Metrics collection failed");
    }
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        encode_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bookshelf_core::{StoreError, Transactional, ValidationError};

    fn test_state() -> Arc<AppState> {
        let store = SqliteLibrary::in_memory().unwrap();
        Arc::new(AppState::new(Config::default(), store))
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            api_error(LibraryError::Validation(ValidationError::IsbnLength(3))).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            api_error(LibraryError::NotFound("book 1".to_string())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            api_error(LibraryError::Conflict("UNIQUE".to_string())).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            api_error(LibraryError::Store(StoreError::Database("io".to_string()))).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_carries_message() {
        let (_, Json(body)) = api_error(LibraryError::NotFound("book 9".to_string()));
        assert_eq!(body.error, "Not found: book 9");
    }

    #[tokio::test]
    async fn test_with_library_maps_errors() {
        let state = test_state();

        let genre = with_library(&state, |library| library.create_genre("Poesia"))
            .await
            .unwrap();
        assert_eq!(genre.name, "Poesia");

        let (status, _) = with_library(&state, |library| library.book(42))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_waiting_for_store_lock_leaves_runtime_free() {
        let state = test_state();
        let (locked_tx, locked_rx) = tokio::sync::oneshot::channel();

        let holder = Arc::clone(&state);
        let busy = tokio::task::spawn_blocking(move || {
            holder
                .library()
                .store()
                .transaction(|_| -> Result<(), StoreError> {
                    let _ = locked_tx.send(());
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(())
                })
        });
        locked_rx.await.unwrap();

        let reader = Arc::clone(&state);
        let read =
            tokio::spawn(async move { with_library(&reader, |library| library.genres()).await });

        // On the single-threaded test runtime a blocked worker would finish
        // the read before this timer could fire.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!read.is_finished());

        busy.await.unwrap().unwrap();
        assert!(read.await.unwrap().unwrap().is_empty());
    }
}
