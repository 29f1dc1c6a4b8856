//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Similarity maintenance (edges written, recompute jobs)
//! - Catalog writes (books and genres created, updated, deleted)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Similarity Metrics
// =============================================================================

/// Similarity edges inserted, by incremental sync or recompute.
pub static SIMILARITY_EDGES_WRITTEN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "bookshelf_similarity_edges_written_total",
        "Total similarity edges inserted",
    )
    .unwrap()
});

/// Similarity edges removed by unlink, deletes, genre changes and rebuilds.
pub static SIMILARITY_EDGES_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "bookshelf_similarity_edges_removed_total",
        "Total similarity edges removed",
    )
    .unwrap()
});

/// Recompute jobs by mode and result.
pub static RECOMPUTE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookshelf_recompute_runs_total", "Total recompute jobs"),
        &["mode", "result"], // result: "completed", "empty_catalog", "rolled_back"
    )
    .unwrap()
});

/// Recompute job duration in seconds.
pub static RECOMPUTE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookshelf_recompute_duration_seconds",
            "Duration of recompute jobs",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
        &["mode"],
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Catalog writes by entity and operation.
pub static CATALOG_WRITES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookshelf_catalog_writes_total", "Total catalog writes"),
        &["entity", "operation"], // entity: "book", "genre"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Similarity
        Box::new(SIMILARITY_EDGES_WRITTEN.clone()),
        Box::new(SIMILARITY_EDGES_REMOVED.clone()),
        Box::new(RECOMPUTE_RUNS.clone()),
        Box::new(RECOMPUTE_DURATION.clone()),
        // Catalog
        Box::new(CATALOG_WRITES.clone()),
    ]
}
