//! In-memory library store for testing.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::catalog::{
    filter_term, Book, BookId, BookQuery, CatalogReader, CatalogStats, CatalogStore, Genre,
    GenreId, NewBook,
};
use crate::similarity::SimilarityStore;
use crate::store::{StoreError, Transactional, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct State {
    genres: BTreeMap<GenreId, Genre>,
    books: BTreeMap<BookId, Book>,
    edges: BTreeSet<(BookId, BookId)>,
    last_genre_id: GenreId,
    last_book_id: BookId,
}

#[derive(Debug, Default)]
struct Faults {
    /// Fail the nth edge insert after arming.
    fail_on_write: Option<usize>,
    writes: usize,
    fail_reads: bool,
    hide_edges: bool,
}

/// In-memory implementation of [`Transactional`].
///
/// Each transaction works on a copy of the state that is swapped in on
/// commit, so a failed unit of work leaves nothing behind. Behaves like the
/// SQLite store for constraints (unique ISBN and genre name, referenced
/// genres, no self-edges) and cascades edge removal on book delete.
///
/// Provides fault injection for testing:
/// - Fail the nth edge write
/// - Fail catalog reads
/// - Make `exists` report every edge as missing
///
/// # Example
///
/// ```rust,ignore
/// use bookshelf_core::testing::{fixtures, InMemoryLibrary};
///
/// let library = InMemoryLibrary::new();
/// let fiction = library.add_genre("Fiction");
/// library.add_book(fixtures::new_book("Dom Casmurro", fiction));
///
/// library.fail_on_write(1);
/// // The next edge insert fails and its transaction rolls back.
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    state: Mutex<State>,
    faults: Mutex<Faults>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // Direct setup, bypassing transactions
    // =========================================================================

    /// Insert a genre, returning its id. Panics on a duplicate name.
    pub fn add_genre(&self, name: &str) -> GenreId {
        let mut state = self.state();
        state
            .insert_genre(name)
            .map(|genre| genre.id)
            .unwrap_or_else(|e| panic!("add_genre({}): {}", name, e))
    }

    /// Insert a book without touching similarity edges.
    pub fn add_book(&self, book: NewBook) -> Book {
        let mut state = self.state();
        state
            .insert_book(&book)
            .unwrap_or_else(|e| panic!("add_book({}): {}", book.title, e))
    }

    /// Insert a single directed edge.
    pub fn insert_edge(&self, subject_id: BookId, similar_id: BookId) {
        self.state().edges.insert((subject_id, similar_id));
    }

    /// All edges, sorted.
    pub fn edges(&self) -> Vec<(BookId, BookId)> {
        self.state().edges.iter().copied().collect()
    }

    /// Books `book_id` points to, ascending.
    pub fn similar_to(&self, book_id: BookId) -> Vec<BookId> {
        self.state()
            .edges
            .iter()
            .filter(|(subject, _)| *subject == book_id)
            .map(|(_, similar)| *similar)
            .collect()
    }

    /// A copy of a stored book.
    pub fn book(&self, id: BookId) -> Option<Book> {
        self.state().books.get(&id).cloned()
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Fail the `n`th edge insert from now on (1-based).
    pub fn fail_on_write(&self, n: usize) {
        let mut faults = self.faults();
        faults.fail_on_write = Some(n);
        faults.writes = 0;
    }

    /// Make catalog reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.faults().fail_reads = fail;
    }

    /// Make `exists` report every edge as missing.
    pub fn hide_edges_from_exists(&self, hide: bool) {
        self.faults().hide_edges = hide;
    }

    /// Clear all injected faults.
    pub fn reset_faults(&self) {
        *self.faults() = Faults::default();
    }
}

impl Transactional for InMemoryLibrary {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn UnitOfWork) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut committed = self.state();
        let session = InMemorySession {
            state: RefCell::new(committed.clone()),
            faults: &self.faults,
        };

        let result = work(&session);
        if result.is_ok() {
            *committed = session.state.into_inner();
        }
        result
    }
}

/// Working copy of the state for one transaction.
struct InMemorySession<'a> {
    state: RefCell<State>,
    faults: &'a Mutex<Faults>,
}

impl InMemorySession<'_> {
    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.faults().fail_reads {
            return Err(StoreError::Database("injected read failure".to_string()));
        }
        Ok(())
    }
}

impl UnitOfWork for InMemorySession<'_> {
    fn catalog(&self) -> &dyn CatalogStore {
        self
    }

    fn similarity(&self) -> &dyn SimilarityStore {
        self
    }
}

impl State {
    fn with_genre_name(&self, mut book: Book) -> Book {
        book.genre_name = self.genres.get(&book.genre_id).map(|g| g.name.clone());
        book
    }

    fn check_book(&self, book: &NewBook, id: Option<BookId>) -> Result<(), StoreError> {
        if !self.genres.contains_key(&book.genre_id) {
            return Err(StoreError::Constraint(
                "FOREIGN KEY constraint failed".to_string(),
            ));
        }
        if self
            .books
            .values()
            .any(|b| b.isbn == book.isbn && Some(b.id) != id)
        {
            return Err(StoreError::Constraint(
                "UNIQUE constraint failed: books.isbn".to_string(),
            ));
        }
        Ok(())
    }

    fn check_genre_name(&self, name: &str, id: Option<GenreId>) -> Result<(), StoreError> {
        if self
            .genres
            .values()
            .any(|g| g.name == name && Some(g.id) != id)
        {
            return Err(StoreError::Constraint(
                "UNIQUE constraint failed: genres.name".to_string(),
            ));
        }
        Ok(())
    }

    fn insert_genre(&mut self, name: &str) -> Result<Genre, StoreError> {
        self.check_genre_name(name, None)?;
        self.last_genre_id += 1;
        let genre = Genre {
            id: self.last_genre_id,
            name: name.to_string(),
        };
        self.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    fn insert_book(&mut self, book: &NewBook) -> Result<Book, StoreError> {
        self.check_book(book, None)?;
        self.last_book_id += 1;
        let now = Utc::now();
        let stored = self.with_genre_name(Book {
            id: self.last_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            genre_id: book.genre_id,
            genre_name: None,
            isbn: book.isbn.clone(),
            published_on: book.published_on,
            created_at: now,
            updated_at: now,
        });
        self.books.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_text(book: &Book, needle: &str) -> bool {
    let id = book.id.to_string();
    let date = book
        .published_on
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    [
        book.title.as_str(),
        book.author.as_str(),
        book.publisher.as_str(),
        book.isbn.as_str(),
        book.genre_name.as_deref().unwrap_or_default(),
        id.as_str(),
        date.as_str(),
    ]
    .iter()
    .any(|field| contains_folded(field, needle))
}

fn matches_query(book: &Book, query: &BookQuery) -> bool {
    let field = |value: &Option<String>, haystack: &str| {
        filter_term(value).map_or(true, |needle| contains_folded(haystack, needle))
    };

    filter_term(&query.text).map_or(true, |needle| matches_text(book, needle))
        && query.genre_id.map_or(true, |g| book.genre_id == g)
        && field(&query.title, &book.title)
        && field(&query.author, &book.author)
        && field(&query.isbn, &book.isbn)
        && field(
            &query.genre_name,
            book.genre_name.as_deref().unwrap_or_default(),
        )
        && query
            .published_on
            .map_or(true, |date| book.published_on == Some(date))
}

impl CatalogReader for InMemorySession<'_> {
    fn list_all(&self) -> Result<Vec<Book>, StoreError> {
        self.check_read()?;
        Ok(self.state.borrow().books.values().cloned().collect())
    }

    fn list_by_genre(
        &self,
        genre_id: GenreId,
        excluding: BookId,
    ) -> Result<Vec<Book>, StoreError> {
        self.check_read()?;
        Ok(self
            .state
            .borrow()
            .books
            .values()
            .filter(|b| b.genre_id == genre_id && b.id != excluding)
            .cloned()
            .collect())
    }
}

impl CatalogStore for InMemorySession<'_> {
    fn get_book(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        self.check_read()?;
        Ok(self.state.borrow().books.get(&id).cloned())
    }

    fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        self.check_read()?;
        Ok(self
            .state
            .borrow()
            .books
            .values()
            .find(|b| b.isbn == isbn)
            .cloned())
    }

    fn insert_book(&self, book: &NewBook) -> Result<Book, StoreError> {
        self.state.borrow_mut().insert_book(book)
    }

    fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book, StoreError> {
        let mut state = self.state.borrow_mut();
        let Some(existing) = state.books.get(&id).cloned() else {
            return Err(StoreError::NotFound(format!("book {}", id)));
        };
        state.check_book(book, Some(id))?;

        let updated = state.with_genre_name(Book {
            title: book.title.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            genre_id: book.genre_id,
            isbn: book.isbn.clone(),
            published_on: book.published_on,
            updated_at: Utc::now(),
            ..existing
        });
        state.books.insert(id, updated.clone());
        Ok(updated)
    }

    fn delete_book(&self, id: BookId) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        if state.books.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("book {}", id)));
        }
        state.edges.retain(|(a, b)| *a != id && *b != id);
        Ok(())
    }

    fn search(&self, query: &BookQuery) -> Result<Vec<Book>, StoreError> {
        self.check_read()?;
        Ok(self
            .state
            .borrow()
            .books
            .values()
            .filter(|b| matches_query(b, query))
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    fn list_by_genres(&self, genre_ids: &[GenreId]) -> Result<Vec<Book>, StoreError> {
        self.check_read()?;
        let mut books: Vec<Book> = self
            .state
            .borrow()
            .books
            .values()
            .filter(|b| genre_ids.contains(&b.genre_id))
            .cloned()
            .collect();
        books.sort_by(|a, b| {
            (&a.genre_name, &a.title, a.id).cmp(&(&b.genre_name, &b.title, b.id))
        });
        Ok(books)
    }

    fn list_genres(&self) -> Result<Vec<Genre>, StoreError> {
        self.check_read()?;
        let mut genres: Vec<Genre> = self.state.borrow().genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    fn get_genre(&self, id: GenreId) -> Result<Option<Genre>, StoreError> {
        self.check_read()?;
        Ok(self.state.borrow().genres.get(&id).cloned())
    }

    fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>, StoreError> {
        self.check_read()?;
        Ok(self
            .state
            .borrow()
            .genres
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    fn insert_genre(&self, name: &str) -> Result<Genre, StoreError> {
        self.state.borrow_mut().insert_genre(name)
    }

    fn rename_genre(&self, id: GenreId, name: &str) -> Result<Genre, StoreError> {
        let mut state = self.state.borrow_mut();
        if !state.genres.contains_key(&id) {
            return Err(StoreError::NotFound(format!("genre {}", id)));
        }
        state.check_genre_name(name, Some(id))?;

        let genre = Genre {
            id,
            name: name.to_string(),
        };
        state.genres.insert(id, genre.clone());
        for book in state.books.values_mut().filter(|b| b.genre_id == id) {
            book.genre_name = Some(name.to_string());
        }
        Ok(genre)
    }

    fn delete_genre(&self, id: GenreId) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        if !state.genres.contains_key(&id) {
            return Err(StoreError::NotFound(format!("genre {}", id)));
        }
        if state.books.values().any(|b| b.genre_id == id) {
            return Err(StoreError::Constraint(
                "FOREIGN KEY constraint failed".to_string(),
            ));
        }
        state.genres.remove(&id);
        Ok(())
    }

    fn stats(&self) -> Result<CatalogStats, StoreError> {
        self.check_read()?;
        let state = self.state.borrow();
        Ok(CatalogStats {
            total_books: state.books.len() as u64,
            total_genres: state.genres.len() as u64,
        })
    }
}

impl SimilarityStore for InMemorySession<'_> {
    fn exists(&self, subject_id: BookId, candidate_id: BookId) -> Result<bool, StoreError> {
        if self.faults().hide_edges {
            return Ok(false);
        }
        Ok(self
            .state
            .borrow()
            .edges
            .contains(&(subject_id, candidate_id)))
    }

    fn add(&self, subject_id: BookId, candidate_id: BookId) -> Result<(), StoreError> {
        {
            let mut faults = self.faults();
            faults.writes += 1;
            if faults.fail_on_write == Some(faults.writes) {
                return Err(StoreError::Database(format!(
                    "injected failure on write {}",
                    faults.writes
                )));
            }
        }

        let mut state = self.state.borrow_mut();
        if subject_id == candidate_id {
            return Err(StoreError::Constraint(
                "CHECK constraint failed: book_id <> similar_id".to_string(),
            ));
        }
        if !state.books.contains_key(&subject_id) || !state.books.contains_key(&candidate_id) {
            return Err(StoreError::Constraint(
                "FOREIGN KEY constraint failed".to_string(),
            ));
        }
        if !state.edges.insert((subject_id, candidate_id)) {
            return Err(StoreError::DuplicateEdge {
                subject_id,
                similar_id: candidate_id,
            });
        }
        Ok(())
    }

    fn remove(&self, subject_id: BookId, candidate_id: BookId) -> Result<bool, StoreError> {
        Ok(self
            .state
            .borrow_mut()
            .edges
            .remove(&(subject_id, candidate_id)))
    }

    fn list_similar_to(&self, subject_id: BookId) -> Result<Vec<BookId>, StoreError> {
        Ok(self
            .state
            .borrow()
            .edges
            .iter()
            .filter(|(subject, _)| *subject == subject_id)
            .map(|(_, similar)| *similar)
            .collect())
    }

    fn remove_all_for(&self, book_id: BookId) -> Result<usize, StoreError> {
        let mut state = self.state.borrow_mut();
        let before = state.edges.len();
        state.edges.retain(|(a, b)| *a != book_id && *b != book_id);
        Ok(before - state.edges.len())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut state = self.state.borrow_mut();
        let removed = state.edges.len();
        state.edges.clear();
        Ok(removed)
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.state.borrow().edges.len() as u64)
    }
}
