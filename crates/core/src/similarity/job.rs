//! Whole-catalog recompute.

use std::time::Instant;

use tracing::{error, info};

use super::{
    BatchError, EngineError, RecomputeMode, RecomputeOutcome, RecomputeStatus, SimilarityEngine,
};
use crate::metrics;
use crate::store::Transactional;

/// Re-derives every similarity edge from current genre assignments.
///
/// The job runs as a single transaction: either every edge it writes (and,
/// in [`RecomputeMode::Rebuild`], every edge it clears) is committed, or
/// none is.
pub struct RecomputeJob<'a, S: Transactional> {
    store: &'a S,
    mode: RecomputeMode,
}

impl<'a, S: Transactional> RecomputeJob<'a, S> {
    pub fn new(store: &'a S, mode: RecomputeMode) -> Self {
        Self { store, mode }
    }

    /// Run the job to completion.
    pub fn run(&self) -> Result<RecomputeOutcome, BatchError> {
        let started = Instant::now();
        let mode = self.mode;
        let mode_label = mode_label(mode);

        info!(mode = mode_label, "Starting similarity recompute");

        let result = self.store.transaction(|uow| -> Result<_, BatchError> {
            let books = uow
                .catalog()
                .list_all()
                .map_err(|source| EngineError::LoadCatalog { source })?;

            let edges_removed = match mode {
                RecomputeMode::Rebuild => uow
                    .similarity()
                    .clear()
                    .map_err(|source| EngineError::ClearEdges { source })?,
                RecomputeMode::Append => 0,
            };

            if books.is_empty() {
                return Ok((RecomputeStatus::EmptyCatalog, 0, 0, edges_removed));
            }

            let report =
                SimilarityEngine::new(uow.catalog(), uow.similarity()).recompute_books(&books)?;

            Ok((
                RecomputeStatus::Completed,
                report.books_processed,
                report.edges_written,
                edges_removed,
            ))
        });

        let elapsed = started.elapsed();
        metrics::RECOMPUTE_DURATION
            .with_label_values(&[mode_label])
            .observe(elapsed.as_secs_f64());

        match result {
            Ok((status, books_processed, edges_written, edges_removed)) => {
                let outcome = RecomputeOutcome {
                    status,
                    mode,
                    books_processed,
                    edges_written,
                    edges_removed,
                    duration_ms: elapsed.as_millis() as u64,
                };

                metrics::RECOMPUTE_RUNS
                    .with_label_values(&[mode_label, status_label(status)])
                    .inc();
                metrics::SIMILARITY_EDGES_REMOVED.inc_by(edges_removed as u64);

                info!(
                    mode = mode_label,
                    status = status_label(status),
                    books_processed,
                    edges_written,
                    edges_removed,
                    duration_ms = outcome.duration_ms,
                    "Similarity recompute committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                metrics::RECOMPUTE_RUNS
                    .with_label_values(&[mode_label, "rolled_back"])
                    .inc();
                error!(mode = mode_label, error = %e, "Similarity recompute rolled back");
                Err(e)
            }
        }
    }
}

fn mode_label(mode: RecomputeMode) -> &'static str {
    match mode {
        RecomputeMode::Rebuild => "rebuild",
        RecomputeMode::Append => "append",
    }
}

fn status_label(status: RecomputeStatus) -> &'static str {
    match status {
        RecomputeStatus::Completed => "completed",
        RecomputeStatus::EmptyCatalog => "empty_catalog",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::testing::{fixtures, InMemoryLibrary};

    #[test]
    fn test_empty_catalog() {
        let library = InMemoryLibrary::new();

        let outcome = RecomputeJob::new(&library, RecomputeMode::Rebuild)
            .run()
            .unwrap();

        assert_eq!(outcome.status, RecomputeStatus::EmptyCatalog);
        assert_eq!(outcome.books_processed, 0);
        assert_eq!(outcome.edges_written, 0);
        assert!(library.edges().is_empty());
    }

    #[test]
    fn test_two_genres() {
        let library = InMemoryLibrary::new();
        let fiction = library.add_genre("Fiction");
        let poetry = library.add_genre("Poetry");
        let a = library.add_book(fixtures::new_book("A", fiction));
        let b = library.add_book(fixtures::new_book("B", fiction));
        let c = library.add_book(fixtures::new_book("C", poetry));

        let outcome = RecomputeJob::new(&library, RecomputeMode::Rebuild)
            .run()
            .unwrap();

        assert_eq!(outcome.status, RecomputeStatus::Completed);
        assert_eq!(outcome.books_processed, 3);
        assert_eq!(outcome.edges_written, 2);
        assert_eq!(library.edges(), vec![(a.id, b.id), (b.id, a.id)]);
        assert!(library.similar_to(c.id).is_empty());
    }

    #[test]
    fn test_rebuild_drops_stale_edges() {
        let library = InMemoryLibrary::new();
        let fiction = library.add_genre("Fiction");
        let poetry = library.add_genre("Poetry");
        let a = library.add_book(fixtures::new_book("A", fiction));
        let b = library.add_book(fixtures::new_book("B", poetry));
        library.insert_edge(a.id, b.id);
        library.insert_edge(b.id, a.id);

        let outcome = RecomputeJob::new(&library, RecomputeMode::Rebuild)
            .run()
            .unwrap();

        assert_eq!(outcome.edges_removed, 2);
        assert!(library.edges().is_empty());
    }

    #[test]
    fn test_append_keeps_existing_edges() {
        let library = InMemoryLibrary::new();
        let fiction = library.add_genre("Fiction");
        let poetry = library.add_genre("Poetry");
        let a = library.add_book(fixtures::new_book("A", fiction));
        let b = library.add_book(fixtures::new_book("B", poetry));
        let c = library.add_book(fixtures::new_book("C", fiction));
        library.insert_edge(a.id, b.id);

        let outcome = RecomputeJob::new(&library, RecomputeMode::Append)
            .run()
            .unwrap();

        assert_eq!(outcome.mode, RecomputeMode::Append);
        assert_eq!(outcome.edges_removed, 0);
        assert_eq!(outcome.edges_written, 2);
        assert_eq!(
            library.edges(),
            vec![(a.id, b.id), (a.id, c.id), (c.id, a.id)]
        );
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let library = InMemoryLibrary::new();
        let fiction = library.add_genre("Fiction");
        for title in ["A", "B", "C"] {
            library.add_book(fixtures::new_book(title, fiction));
        }

        RecomputeJob::new(&library, RecomputeMode::Append)
            .run()
            .unwrap();
        let first = library.edges();
        let second = RecomputeJob::new(&library, RecomputeMode::Append)
            .run()
            .unwrap();

        assert_eq!(second.edges_written, 0);
        assert_eq!(library.edges(), first);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn test_failure_rolls_back_everything() {
        let library = InMemoryLibrary::new();
        let fiction = library.add_genre("Fiction");
        let poetry = library.add_genre("Poetry");
        let a = library.add_book(fixtures::new_book("A", fiction));
        let b = library.add_book(fixtures::new_book("B", poetry));
        library.add_book(fixtures::new_book("C", fiction));
        library.add_book(fixtures::new_book("D", poetry));
        library.insert_edge(a.id, b.id);
        library.fail_on_write(3);

        let err = RecomputeJob::new(&library, RecomputeMode::Rebuild)
            .run()
            .unwrap_err();

        assert!(matches!(
            err,
            BatchError::Engine(EngineError::WriteEdge { .. })
        ));
        // The cleared stale edge is restored along with the partial writes.
        assert_eq!(library.edges(), vec![(a.id, b.id)]);
    }

    #[test]
    fn test_load_failure_is_reported() {
        let library = InMemoryLibrary::new();
        library.fail_reads(true);

        let err = RecomputeJob::new(&library, RecomputeMode::Rebuild)
            .run()
            .unwrap_err();

        assert_eq!(
            err,
            BatchError::Engine(EngineError::LoadCatalog {
                source: StoreError::Database("injected read failure".to_string()),
            })
        );
    }
}
