//! SQLite implementation of the similarity store.

use rusqlite::{params, ErrorCode};

use super::SimilarityStore;
use crate::catalog::BookId;
use crate::store::{map_sqlite_error, SqliteSession, StoreError};

impl SimilarityStore for SqliteSession<'_> {
    fn exists(&self, subject_id: BookId, candidate_id: BookId) -> Result<bool, StoreError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM similar_books WHERE book_id = ? AND similar_id = ?",
                params![subject_id, candidate_id],
                |row| row.get(0),
            )
            .map_err(map_sqlite_error)?;

        Ok(count > 0)
    }

    fn add(&self, subject_id: BookId, candidate_id: BookId) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO similar_books (book_id, similar_id) VALUES (?, ?)",
                params![subject_id, candidate_id],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == ErrorCode::ConstraintViolation
                        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    StoreError::DuplicateEdge {
                        subject_id,
                        similar_id: candidate_id,
                    }
                }
                other => map_sqlite_error(other),
            })?;

        Ok(())
    }

    fn remove(&self, subject_id: BookId, candidate_id: BookId) -> Result<bool, StoreError> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM similar_books WHERE book_id = ? AND similar_id = ?",
                params![subject_id, candidate_id],
            )
            .map_err(map_sqlite_error)?;

        Ok(rows_affected > 0)
    }

    fn list_similar_to(&self, subject_id: BookId) -> Result<Vec<BookId>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT similar_id FROM similar_books WHERE book_id = ? ORDER BY similar_id")
            .map_err(map_sqlite_error)?;

        let rows = stmt
            .query_map(params![subject_id], |row| row.get(0))
            .map_err(map_sqlite_error)?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(map_sqlite_error)?);
        }
        Ok(ids)
    }

    fn remove_all_for(&self, book_id: BookId) -> Result<usize, StoreError> {
        self.conn
            .execute(
                "DELETE FROM similar_books WHERE book_id = ?1 OR similar_id = ?1",
                params![book_id],
            )
            .map_err(map_sqlite_error)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        self.conn
            .execute("DELETE FROM similar_books", [])
            .map_err(map_sqlite_error)
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM similar_books", [], |row| row.get(0))
            .map_err(map_sqlite_error)
    }
}
