use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{books, genres, handlers, middleware::metrics_middleware, reports, similarity};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and stats
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/stats", get(handlers::get_stats))
        // Genres
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/{id}",
            get(genres::get_genre)
                .put(genres::rename_genre)
                .delete(genres::delete_genre),
        )
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/isbn/{isbn}", get(books::get_book_by_isbn))
        .route(
            "/books/{id}",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Similarity
        .route("/books/{id}/similar", get(similarity::list_similar))
        .route("/books/{id}/similar/{other_id}", delete(similarity::unlink))
        .route("/similarity/recompute", post(similarity::recompute))
        // Reports
        .route("/reports/genres", get(reports::genre_report));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
