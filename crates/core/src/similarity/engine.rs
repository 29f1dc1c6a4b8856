//! Derivation of similarity edges from genre assignments.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::{EngineError, RecomputeReport, SimilarityStore, SyncReport};
use crate::catalog::{Book, BookId, CatalogReader, GenreId};
use crate::metrics;
use crate::store::StoreError;

/// Computes and applies similarity edges.
///
/// Holds no state of its own: it borrows a catalog reader and a similarity
/// store, normally both views of the same
/// [`UnitOfWork`](crate::store::UnitOfWork).
pub struct SimilarityEngine<'a, C: ?Sized, S: ?Sized> {
    catalog: &'a C,
    edges: &'a S,
}

impl<'a, C, S> SimilarityEngine<'a, C, S>
where
    C: CatalogReader + ?Sized,
    S: SimilarityStore + ?Sized,
{
    pub fn new(catalog: &'a C, edges: &'a S) -> Self {
        Self { catalog, edges }
    }

    /// Link `book` with every other book of its genre, in both directions.
    ///
    /// Edges that already exist are left alone, so calling this repeatedly
    /// is idempotent.
    pub fn sync_pairwise(&self, book: &Book) -> Result<SyncReport, EngineError> {
        let candidates = self
            .catalog
            .list_by_genre(book.genre_id, book.id)
            .map_err(|source| EngineError::LoadCandidates {
                genre_id: book.genre_id,
                source,
            })?;

        let mut edges_written = 0;
        for candidate in candidates.iter().filter(|c| c.id != book.id) {
            edges_written += self.link(book.id, candidate.id)?;
        }

        debug!(
            book_id = book.id,
            genre_id = book.genre_id,
            candidates = candidates.len(),
            edges_written,
            "Synced similar books"
        );
        metrics::SIMILARITY_EDGES_WRITTEN.inc_by(edges_written as u64);

        Ok(SyncReport {
            candidates: candidates.len(),
            edges_written,
        })
    }

    /// Derive edges for the whole catalog.
    pub fn recompute_all(&self) -> Result<RecomputeReport, EngineError> {
        let books = self
            .catalog
            .list_all()
            .map_err(|source| EngineError::LoadCatalog { source })?;
        self.recompute_books(&books)
    }

    /// Derive edges among `books`.
    ///
    /// Books are grouped by genre first, so only pairs inside a group are
    /// visited. Writes follow the order of `books`.
    pub fn recompute_books(&self, books: &[Book]) -> Result<RecomputeReport, EngineError> {
        let mut groups: BTreeMap<GenreId, Vec<BookId>> = BTreeMap::new();
        for book in books {
            groups.entry(book.genre_id).or_default().push(book.id);
        }

        let mut edges_written = 0;
        for book in books {
            let group = groups.get(&book.genre_id).map(Vec::as_slice).unwrap_or_default();
            for &other in group.iter().filter(|&&other| other != book.id) {
                edges_written += self.link(book.id, other)?;
            }
        }

        metrics::SIMILARITY_EDGES_WRITTEN.inc_by(edges_written as u64);

        Ok(RecomputeReport {
            books_processed: books.len(),
            genre_groups: groups.len(),
            edges_written,
        })
    }

    /// Ensure both directions between `a` and `b`, returning edges written.
    fn link(&self, a: BookId, b: BookId) -> Result<usize, EngineError> {
        let forward = self.ensure_edge(a, b)?;
        let backward = self.ensure_edge(b, a)?;
        Ok(usize::from(forward) + usize::from(backward))
    }

    fn ensure_edge(&self, subject_id: BookId, similar_id: BookId) -> Result<bool, EngineError> {
        let wrap = |source| EngineError::WriteEdge {
            subject_id,
            similar_id,
            source,
        };

        if self.edges.exists(subject_id, similar_id).map_err(wrap)? {
            return Ok(false);
        }

        match self.edges.add(subject_id, similar_id) {
            Ok(()) => {
                trace!(subject_id, similar_id, "Added similarity edge");
                Ok(true)
            }
            // Someone else wrote it between the check and the insert.
            Err(StoreError::DuplicateEdge { .. }) => Ok(false),
            Err(e) => Err(wrap(e)),
        }
    }
}
