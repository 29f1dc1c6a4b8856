//! Testing utilities: an in-memory store and catalog fixtures.
//!
//! [`InMemoryLibrary`] implements [`Transactional`](crate::store::Transactional)
//! with the same constraint behavior as the SQLite store, plus fault
//! injection for exercising rollback paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookshelf_core::testing::{fixtures, InMemoryLibrary};
//! use bookshelf_core::{Library, SimilarityConfig};
//!
//! let store = InMemoryLibrary::new();
//! let fiction = store.add_genre("Fiction");
//! store.add_book(fixtures::new_book("Iracema", fiction));
//!
//! let library = Library::new(store, SimilarityConfig::default());
//! ```

mod in_memory;

pub use in_memory::InMemoryLibrary;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::NaiveDate;

    use crate::catalog::{GenreId, NewBook};

    static NEXT_ISBN: AtomicU64 = AtomicU64::new(1);

    /// A valid ISBN not returned by any earlier call.
    pub fn unique_isbn() -> String {
        format!("978{:010}", NEXT_ISBN.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a book with reasonable defaults and a unique ISBN.
    pub fn new_book(title: &str, genre_id: GenreId) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Machado de Assis".to_string(),
            publisher: "Garnier".to_string(),
            genre_id,
            isbn: unique_isbn(),
            published_on: NaiveDate::from_ymd_opt(1899, 1, 1),
        }
    }

    /// Create a book by a specific author.
    pub fn book_by(title: &str, author: &str, genre_id: GenreId) -> NewBook {
        NewBook {
            author: author.to_string(),
            ..new_book(title, genre_id)
        }
    }
}
