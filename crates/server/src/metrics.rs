//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the bookshelf server:
//! - HTTP request metrics (latency, counts)
//! - Catalog size (collected dynamically)
//! - Core similarity and catalog write counters

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookshelf_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookshelf_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookshelf_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Books in the catalog.
pub static CATALOG_BOOKS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("bookshelf_catalog_books", "Number of books in the catalog").unwrap()
});

/// Genres in the catalog.
pub static CATALOG_GENRES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("bookshelf_catalog_genres", "Number of genres in the catalog").unwrap()
});

/// Stored similarity edges.
pub static SIMILARITY_EDGES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookshelf_similarity_edges",
        "Number of stored similarity edges",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Catalog
    registry.register(Box::new(CATALOG_BOOKS.clone())).unwrap();
    registry.register(Box::new(CATALOG_GENRES.clone())).unwrap();
    registry
        .register(Box::new(SIMILARITY_EDGES.clone()))
        .unwrap();

    // Core metrics (similarity maintenance, catalog writes)
    for metric in bookshelf_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the catalog gauges reflect the database.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.library().stats() {
        Ok(stats) => {
            CATALOG_BOOKS.set(stats.books as i64);
            CATALOG_GENRES.set(stats.genres as i64);
            SIMILARITY_EDGES.set(stats.similarity_edges as i64);
        }
        Err(e) => warn!(error = %e, "Failed to collect catalog metrics"),
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    static NUMERIC: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

    // A trailing match consumes the separator, so run twice for adjacent ids
    let result = NUMERIC.replace_all(path, "/{id}$1");
    let result = NUMERIC.replace_all(&result, "/{id}$1");
    result.to_string()
}
