//! Application service over the catalog and the similarity relation.
//!
//! Every operation runs in one transaction of the backing store. Book saves
//! keep the similarity relation consistent in that same transaction: a genre
//! change drops the book's old edges, and with `sync_on_save` enabled the
//! book is linked to the rest of its genre before the commit.

mod error;
mod report;

pub use error::LibraryError;
pub use report::{GenreReport, GenreReportRow};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{
    validate_genre_name, validate_isbn, Book, BookId, BookQuery, CatalogStore, Genre, GenreId,
    NewBook, ValidationError,
};
use crate::config::SimilarityConfig;
use crate::metrics;
use crate::similarity::{RecomputeJob, RecomputeOutcome, SimilarityEngine};
use crate::store::Transactional;

/// Catalog and similarity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub books: u64,
    pub genres: u64,
    pub similarity_edges: u64,
}

/// The bookstore catalog.
pub struct Library<S: Transactional> {
    store: S,
    config: SimilarityConfig,
}

impl<S: Transactional> Library<S> {
    pub fn new(store: S, config: SimilarityConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    // =========================================================================
    // Genres
    // =========================================================================

    pub fn create_genre(&self, name: &str) -> Result<Genre, LibraryError> {
        let name = validate_genre_name(name)?;
        let genre = self
            .store
            .transaction(|uow| -> Result<_, LibraryError> {
                Ok(uow.catalog().insert_genre(&name)?)
            })?;

        metrics::CATALOG_WRITES
            .with_label_values(&["genre", "create"])
            .inc();
        info!(genre_id = genre.id, name = %genre.name, "Created genre");
        Ok(genre)
    }

    pub fn rename_genre(&self, id: GenreId, name: &str) -> Result<Genre, LibraryError> {
        let name = validate_genre_name(name)?;
        let genre = self
            .store
            .transaction(|uow| -> Result<_, LibraryError> {
                Ok(uow.catalog().rename_genre(id, &name)?)
            })?;

        metrics::CATALOG_WRITES
            .with_label_values(&["genre", "update"])
            .inc();
        info!(genre_id = id, name = %genre.name, "Renamed genre");
        Ok(genre)
    }

    /// Delete a genre. Fails with [`LibraryError::Conflict`] while books
    /// still reference it.
    pub fn delete_genre(&self, id: GenreId) -> Result<(), LibraryError> {
        self.store.transaction(|uow| -> Result<_, LibraryError> {
            Ok(uow.catalog().delete_genre(id)?)
        })?;

        metrics::CATALOG_WRITES
            .with_label_values(&["genre", "delete"])
            .inc();
        info!(genre_id = id, "Deleted genre");
        Ok(())
    }

    pub fn genre(&self, id: GenreId) -> Result<Genre, LibraryError> {
        self.store.transaction(|uow| -> Result<_, LibraryError> {
            uow.catalog()
                .get_genre(id)?
                .ok_or_else(|| LibraryError::NotFound(format!("genre {}", id)))
        })
    }

    pub fn genres(&self) -> Result<Vec<Genre>, LibraryError> {
        self.store
            .transaction(|uow| -> Result<_, LibraryError> { Ok(uow.catalog().list_genres()?) })
    }

    // =========================================================================
    // Books
    // =========================================================================

    /// Add a book and link it to the other books of its genre.
    pub fn add_book(&self, book: &NewBook) -> Result<Book, LibraryError> {
        let book = book.normalized()?;
        let sync_on_save = self.config.sync_on_save;

        let created = self.store.transaction(|uow| -> Result<_, LibraryError> {
            require_genre(uow.catalog(), book.genre_id)?;
            let created = uow.catalog().insert_book(&book)?;

            if sync_on_save {
                SimilarityEngine::new(uow.catalog(), uow.similarity()).sync_pairwise(&created)?;
            }
            Ok(created)
        })?;

        metrics::CATALOG_WRITES
            .with_label_values(&["book", "create"])
            .inc();
        info!(book_id = created.id, genre_id = created.genre_id, "Added book");
        Ok(created)
    }

    /// Replace a book's fields.
    ///
    /// When the genre changes, the book's existing similarity edges are
    /// removed before it is re-linked within its new genre.
    pub fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book, LibraryError> {
        let book = book.normalized()?;
        let sync_on_save = self.config.sync_on_save;

        let updated = self.store.transaction(|uow| -> Result<_, LibraryError> {
            let existing = require_book(uow.catalog(), id)?;
            require_genre(uow.catalog(), book.genre_id)?;
            let updated = uow.catalog().update_book(id, &book)?;

            if existing.genre_id != updated.genre_id {
                let removed = uow.similarity().remove_all_for(id)?;
                metrics::SIMILARITY_EDGES_REMOVED.inc_by(removed as u64);
                debug!(
                    book_id = id,
                    from_genre = existing.genre_id,
                    to_genre = updated.genre_id,
                    removed,
                    "Genre changed, dropped similarity edges"
                );
            }

            if sync_on_save {
                SimilarityEngine::new(uow.catalog(), uow.similarity()).sync_pairwise(&updated)?;
            }
            Ok(updated)
        })?;

        metrics::CATALOG_WRITES
            .with_label_values(&["book", "update"])
            .inc();
        info!(book_id = id, "Updated book");
        Ok(updated)
    }

    /// Delete a book together with every edge mentioning it.
    pub fn delete_book(&self, id: BookId) -> Result<(), LibraryError> {
        let removed = self.store.transaction(|uow| -> Result<_, LibraryError> {
            require_book(uow.catalog(), id)?;
            let removed = uow.similarity().remove_all_for(id)?;
            uow.catalog().delete_book(id)?;
            Ok(removed)
        })?;

        metrics::CATALOG_WRITES
            .with_label_values(&["book", "delete"])
            .inc();
        metrics::SIMILARITY_EDGES_REMOVED.inc_by(removed as u64);
        info!(book_id = id, edges_removed = removed, "Deleted book");
        Ok(())
    }

    pub fn book(&self, id: BookId) -> Result<Book, LibraryError> {
        self.store
            .transaction(|uow| -> Result<_, LibraryError> { require_book(uow.catalog(), id) })
    }

    pub fn book_by_isbn(&self, isbn: &str) -> Result<Book, LibraryError> {
        let isbn = validate_isbn(isbn)?;
        self.store.transaction(|uow| -> Result<_, LibraryError> {
            uow.catalog()
                .find_by_isbn(&isbn)?
                .ok_or_else(|| LibraryError::NotFound(format!("book with ISBN {}", isbn)))
        })
    }

    pub fn search(&self, query: &BookQuery) -> Result<Vec<Book>, LibraryError> {
        self.store
            .transaction(|uow| -> Result<_, LibraryError> { Ok(uow.catalog().search(query)?) })
    }

    /// All books, in ascending id order.
    pub fn books(&self) -> Result<Vec<Book>, LibraryError> {
        self.store
            .transaction(|uow| -> Result<_, LibraryError> { Ok(uow.catalog().list_all()?) })
    }

    // =========================================================================
    // Similarity
    // =========================================================================

    /// Books similar to `id`, in ascending id order.
    pub fn similar_books(&self, id: BookId) -> Result<Vec<Book>, LibraryError> {
        self.store.transaction(|uow| -> Result<_, LibraryError> {
            require_book(uow.catalog(), id)?;
            let mut similar = Vec::new();
            for other in uow.similarity().list_similar_to(id)? {
                if let Some(book) = uow.catalog().get_book(other)? {
                    similar.push(book);
                }
            }
            Ok(similar)
        })
    }

    /// Remove the similarity between two books, in both directions.
    ///
    /// Returns the number of edges removed; unlinking books that were not
    /// linked is not an error.
    pub fn unlink(&self, a: BookId, b: BookId) -> Result<usize, LibraryError> {
        let removed = self.store.transaction(|uow| -> Result<_, LibraryError> {
            require_book(uow.catalog(), a)?;
            require_book(uow.catalog(), b)?;
            let edges = uow.similarity();
            Ok(usize::from(edges.remove(a, b)?) + usize::from(edges.remove(b, a)?))
        })?;

        metrics::SIMILARITY_EDGES_REMOVED.inc_by(removed as u64);
        info!(book_id = a, other_id = b, removed, "Unlinked similar books");
        Ok(removed)
    }

    /// Re-derive every similarity edge with the configured mode.
    pub fn recompute(&self) -> Result<RecomputeOutcome, LibraryError> {
        Ok(RecomputeJob::new(&self.store, self.config.recompute_mode).run()?)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Books of the given genres. An empty slice selects every genre.
    pub fn genre_report(&self, genre_ids: &[GenreId]) -> Result<GenreReport, LibraryError> {
        self.store.transaction(|uow| -> Result<_, LibraryError> {
            let catalog = uow.catalog();
            let genres = if genre_ids.is_empty() {
                catalog.list_genres()?
            } else {
                let mut genres = Vec::with_capacity(genre_ids.len());
                for &id in genre_ids {
                    let genre = catalog
                        .get_genre(id)?
                        .ok_or_else(|| LibraryError::NotFound(format!("genre {}", id)))?;
                    if !genres.contains(&genre) {
                        genres.push(genre);
                    }
                }
                genres.sort_by(|a, b| a.name.cmp(&b.name));
                genres
            };

            let ids: Vec<GenreId> = genres.iter().map(|g| g.id).collect();
            let books = catalog.list_by_genres(&ids)?;
            Ok(GenreReport::new(genres, books))
        })
    }

    pub fn stats(&self) -> Result<LibraryStats, LibraryError> {
        self.store.transaction(|uow| -> Result<_, LibraryError> {
            let catalog = uow.catalog().stats()?;
            Ok(LibraryStats {
                books: catalog.total_books,
                genres: catalog.total_genres,
                similarity_edges: uow.similarity().count()?,
            })
        })
    }
}

fn require_book(catalog: &dyn CatalogStore, id: BookId) -> Result<Book, LibraryError> {
    catalog
        .get_book(id)?
        .ok_or_else(|| LibraryError::NotFound(format!("book {}", id)))
}

fn require_genre(catalog: &dyn CatalogStore, id: GenreId) -> Result<Genre, LibraryError> {
    catalog
        .get_genre(id)?
        .ok_or(LibraryError::Validation(ValidationError::UnknownGenre(id)))
}
