//! Book catalog: books, genres and the queries over them.
//!
//! The similarity subsystem only needs [`CatalogReader`]; the application
//! service uses the full [`CatalogStore`].

mod sqlite;
mod types;

pub use types::*;

use crate::store::StoreError;

/// Read interface the similarity engine consumes.
pub trait CatalogReader {
    /// All books, in ascending id order.
    fn list_all(&self) -> Result<Vec<Book>, StoreError>;

    /// Books of `genre_id`, excluding the book `excluding`.
    fn list_by_genre(&self, genre_id: GenreId, excluding: BookId)
        -> Result<Vec<Book>, StoreError>;
}

/// Full catalog storage.
pub trait CatalogStore: CatalogReader {
    /// Get a book by id.
    fn get_book(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    /// Get a book by ISBN.
    fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError>;

    /// Insert a book, returning it with its generated id.
    fn insert_book(&self, book: &NewBook) -> Result<Book, StoreError>;

    /// Replace every mutable field of an existing book.
    fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book, StoreError>;

    /// Delete a book. Fails with `NotFound` if it does not exist.
    fn delete_book(&self, id: BookId) -> Result<(), StoreError>;

    /// Search books by free text, genre and per-field filters, all combined.
    fn search(&self, query: &BookQuery) -> Result<Vec<Book>, StoreError>;

    /// Books belonging to any of `genre_ids`, ordered by genre name then title.
    fn list_by_genres(&self, genre_ids: &[GenreId]) -> Result<Vec<Book>, StoreError>;

    /// All genres, ordered by name.
    fn list_genres(&self) -> Result<Vec<Genre>, StoreError>;

    /// Get a genre by id.
    fn get_genre(&self, id: GenreId) -> Result<Option<Genre>, StoreError>;

    /// Get a genre by exact name.
    fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>, StoreError>;

    /// Insert a genre. Names are unique.
    fn insert_genre(&self, name: &str) -> Result<Genre, StoreError>;

    /// Rename a genre.
    fn rename_genre(&self, id: GenreId, name: &str) -> Result<Genre, StoreError>;

    /// Delete a genre. Fails with `Constraint` while books still reference it.
    fn delete_genre(&self, id: GenreId) -> Result<(), StoreError>;

    /// Catalog statistics.
    fn stats(&self) -> Result<CatalogStats, StoreError>;
}
