//! SQLite-backed library storage.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use tracing::{debug, warn};

use super::{StoreError, Transactional, UnitOfWork};
use crate::catalog::CatalogStore;
use crate::similarity::SimilarityStore;

/// SQLite database holding the catalog and the similarity edges.
///
/// A single connection sits behind a mutex; a transaction keeps the lock for
/// its whole duration, so writers never interleave.
pub struct SqliteLibrary {
    conn: Mutex<Connection>,
}

impl SqliteLibrary {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(map_sqlite_error)?;
        Self::register_functions(&conn)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Self::register_functions(&conn)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// `casefold(text)`: Unicode lowercase. SQLite's own `lower` and `LIKE`
    /// only fold ASCII letters.
    fn register_functions(conn: &Connection) -> Result<(), StoreError> {
        conn.create_scalar_function(
            "casefold",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        )
        .map_err(map_sqlite_error)
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS genres (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                publisher TEXT NOT NULL,
                genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE RESTRICT,
                isbn TEXT NOT NULL UNIQUE,
                published_on TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_books_genre ON books(genre_id);
            CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);

            -- Directed similarity edges; symmetry is maintained by the engine
            CREATE TABLE IF NOT EXISTS similar_books (
                book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                similar_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                PRIMARY KEY (book_id, similar_id),
                CHECK (book_id <> similar_id)
            );

            CREATE INDEX IF NOT EXISTS idx_similar_books_similar ON similar_books(similar_id);
            "#,
        )
        .map_err(map_sqlite_error)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }
}

impl Transactional for SqliteLibrary {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn UnitOfWork) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sqlite_error)?;

        let session = SqliteSession { conn: &tx };
        let result = work(&session);
        match result {
            Ok(value) => {
                tx.commit().map_err(map_sqlite_error)?;
                debug!("Transaction committed");
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                debug!("Transaction rolled back");
                Err(e)
            }
        }
    }
}

/// Store views over a connection that is inside a transaction.
///
/// Implements [`CatalogStore`] and [`SimilarityStore`]; only reachable
/// through [`Transactional::transaction`].
pub struct SqliteSession<'c> {
    pub(crate) conn: &'c Connection,
}

impl UnitOfWork for SqliteSession<'_> {
    fn catalog(&self) -> &dyn CatalogStore {
        self
    }

    fn similarity(&self) -> &dyn SimilarityStore {
        self
    }
}

/// Map a rusqlite error, keeping constraint violations distinct.
pub(crate) fn map_sqlite_error(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => StoreError::Database(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewBook;

    fn new_book(genre_id: i64, isbn: &str) -> NewBook {
        NewBook {
            title: "Title".to_string(),
            author: "Author".to_string(),
            publisher: "Publisher".to_string(),
            genre_id,
            isbn: isbn.to_string(),
            published_on: None,
        }
    }

    #[test]
    fn test_commit_persists_writes() {
        let library = SqliteLibrary::in_memory().unwrap();

        library
            .transaction(|uow| uow.catalog().insert_genre("Fiction").map(|_| ()))
            .unwrap();

        let genres = library
            .transaction(|uow| uow.catalog().list_genres())
            .unwrap();
        assert_eq!(genres.len(), 1);
        assert_eq!(genres[0].name, "Fiction");
    }

    #[test]
    fn test_error_rolls_back_writes() {
        let library = SqliteLibrary::in_memory().unwrap();

        let result: Result<(), StoreError> = library.transaction(|uow| {
            uow.catalog().insert_genre("Fiction")?;
            Err(StoreError::Database("boom".to_string()))
        });
        assert!(result.is_err());

        let genres = library
            .transaction(|uow| uow.catalog().list_genres())
            .unwrap();
        assert!(genres.is_empty());
    }

    #[test]
    fn test_reopen_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.db");

        {
            let library = SqliteLibrary::new(&path).unwrap();
            library
                .transaction(|uow| {
                    let genre = uow.catalog().insert_genre("Poetry")?;
                    uow.catalog().insert_book(&new_book(genre.id, "1111111111111"))
                })
                .unwrap();
        }

        let library = SqliteLibrary::new(&path).unwrap();
        let books = library.transaction(|uow| uow.catalog().list_all()).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].genre_name.as_deref(), Some("Poetry"));
    }

    #[test]
    fn test_unknown_genre_is_constraint_violation() {
        let library = SqliteLibrary::in_memory().unwrap();
        let result = library
            .transaction(|uow| uow.catalog().insert_book(&new_book(42, "2222222222222")));
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }
}
