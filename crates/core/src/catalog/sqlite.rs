//! SQLite implementation of the catalog store.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension};

use super::{
    filter_term, Book, BookId, BookQuery, CatalogReader, CatalogStats, CatalogStore, Genre,
    GenreId, NewBook,
};
use crate::store::{map_sqlite_error, SqliteSession, StoreError};

const SELECT_BOOK: &str = "SELECT b.id, b.title, b.author, b.publisher, b.genre_id, g.name,
        b.isbn, b.published_on, b.created_at, b.updated_at
     FROM books b JOIN genres g ON g.id = b.genre_id";

const DATE_FORMAT: &str = "%Y-%m-%d";

impl SqliteSession<'_> {
    fn query_books(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Book>, StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map(params, row_to_book)
            .map_err(map_sqlite_error)?;

        let mut books = Vec::new();
        for row in rows {
            books.push(row.map_err(map_sqlite_error)?);
        }
        Ok(books)
    }

    fn require_book(&self, id: BookId) -> Result<Book, StoreError> {
        self.get_book(id)?
            .ok_or_else(|| StoreError::NotFound(format!("book {}", id)))
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
    let published_on: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        publisher: row.get(3)?,
        genre_id: row.get(4)?,
        genre_name: row.get(5)?,
        isbn: row.get(6)?,
        published_on: published_on
            .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

/// `%needle%` for `LIKE ... ESCAPE '\'`, case-folded to match `casefold`.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl CatalogReader for SqliteSession<'_> {
    fn list_all(&self) -> Result<Vec<Book>, StoreError> {
        self.query_books(&format!("{} ORDER BY b.id", SELECT_BOOK), [])
    }

    fn list_by_genre(
        &self,
        genre_id: GenreId,
        excluding: BookId,
    ) -> Result<Vec<Book>, StoreError> {
        self.query_books(
            &format!(
                "{} WHERE b.genre_id = ? AND b.id <> ? ORDER BY b.id",
                SELECT_BOOK
            ),
            params![genre_id, excluding],
        )
    }
}

impl CatalogStore for SqliteSession<'_> {
    fn get_book(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        self.conn
            .query_row(
                &format!("{} WHERE b.id = ?", SELECT_BOOK),
                params![id],
                row_to_book,
            )
            .optional()
            .map_err(map_sqlite_error)
    }

    fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        self.conn
            .query_row(
                &format!("{} WHERE b.isbn = ?", SELECT_BOOK),
                params![isbn],
                row_to_book,
            )
            .optional()
            .map_err(map_sqlite_error)
    }

    fn insert_book(&self, book: &NewBook) -> Result<Book, StoreError> {
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO books
                    (title, author, publisher, genre_id, isbn, published_on, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    &book.title,
                    &book.author,
                    &book.publisher,
                    book.genre_id,
                    &book.isbn,
                    format_date(book.published_on),
                    &now,
                    &now,
                ],
            )
            .map_err(map_sqlite_error)?;

        self.require_book(self.conn.last_insert_rowid())
    }

    fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book, StoreError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE books SET title = ?, author = ?, publisher = ?, genre_id = ?, isbn = ?,
                        published_on = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    &book.title,
                    &book.author,
                    &book.publisher,
                    book.genre_id,
                    &book.isbn,
                    format_date(book.published_on),
                    Utc::now().to_rfc3339(),
                    id,
                ],
            )
            .map_err(map_sqlite_error)?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("book {}", id)));
        }

        self.require_book(id)
    }

    fn delete_book(&self, id: BookId) -> Result<(), StoreError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM books WHERE id = ?", params![id])
            .map_err(map_sqlite_error)?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("book {}", id)));
        }

        Ok(())
    }

    fn search(&self, query: &BookQuery) -> Result<Vec<Book>, StoreError> {
        let pattern = |value: &Option<String>| filter_term(value).map(contains_pattern);

        self.query_books(
            &format!(
                "{} WHERE (?1 IS NULL
                        OR casefold(b.title) LIKE ?1 ESCAPE '\\'
                        OR casefold(b.author) LIKE ?1 ESCAPE '\\'
                        OR casefold(b.publisher) LIKE ?1 ESCAPE '\\'
                        OR b.isbn LIKE ?1 ESCAPE '\\'
                        OR casefold(g.name) LIKE ?1 ESCAPE '\\'
                        OR CAST(b.id AS TEXT) LIKE ?1 ESCAPE '\\'
                        OR b.published_on LIKE ?1 ESCAPE '\\')
                   AND (?2 IS NULL OR b.genre_id = ?2)
                   AND (?3 IS NULL OR casefold(b.title) LIKE ?3 ESCAPE '\\')
                   AND (?4 IS NULL OR casefold(b.author) LIKE ?4 ESCAPE '\\')
                   AND (?5 IS NULL OR b.isbn LIKE ?5 ESCAPE '\\')
                   AND (?6 IS NULL OR casefold(g.name) LIKE ?6 ESCAPE '\\')
                   AND (?7 IS NULL OR b.published_on = ?7)
                 ORDER BY b.id
                 LIMIT ?8 OFFSET ?9",
                SELECT_BOOK
            ),
            params![
                pattern(&query.text),
                query.genre_id,
                pattern(&query.title),
                pattern(&query.author),
                pattern(&query.isbn),
                pattern(&query.genre_name),
                format_date(query.published_on),
                query.limit,
                query.offset,
            ],
        )
    }

    fn list_by_genres(&self, genre_ids: &[GenreId]) -> Result<Vec<Book>, StoreError> {
        if genre_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; genre_ids.len()].join(", ");
        self.query_books(
            &format!(
                "{} WHERE b.genre_id IN ({}) ORDER BY g.name, b.title, b.id",
                SELECT_BOOK, placeholders
            ),
            params_from_iter(genre_ids.iter()),
        )
    }

    fn list_genres(&self) -> Result<Vec<Genre>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM genres ORDER BY name")
            .map_err(map_sqlite_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Genre {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(map_sqlite_error)?;

        let mut genres = Vec::new();
        for row in rows {
            genres.push(row.map_err(map_sqlite_error)?);
        }
        Ok(genres)
    }

    fn get_genre(&self, id: GenreId) -> Result<Option<Genre>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name FROM genres WHERE id = ?",
                params![id],
                |row| {
                    Ok(Genre {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(map_sqlite_error)
    }

    fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name FROM genres WHERE name = ?",
                params![name],
                |row| {
                    Ok(Genre {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(map_sqlite_error)
    }

    fn insert_genre(&self, name: &str) -> Result<Genre, StoreError> {
        self.conn
            .execute("INSERT INTO genres (name) VALUES (?)", params![name])
            .map_err(map_sqlite_error)?;

        Ok(Genre {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn rename_genre(&self, id: GenreId, name: &str) -> Result<Genre, StoreError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE genres SET name = ? WHERE id = ?",
                params![name, id],
            )
            .map_err(map_sqlite_error)?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("genre {}", id)));
        }

        Ok(Genre {
            id,
            name: name.to_string(),
        })
    }

    fn delete_genre(&self, id: GenreId) -> Result<(), StoreError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM genres WHERE id = ?", params![id])
            .map_err(map_sqlite_error)?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("genre {}", id)));
        }

        Ok(())
    }

    fn stats(&self) -> Result<CatalogStats, StoreError> {
        let total_books: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(map_sqlite_error)?;

        let total_genres: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM genres", [], |row| row.get(0))
            .map_err(map_sqlite_error)?;

        Ok(CatalogStats {
            total_books,
            total_genres,
        })
    }
}
