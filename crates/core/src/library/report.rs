//! Books-by-genre report.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Book, Genre};

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreReportRow {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub publisher: String,
    pub published_on: Option<NaiveDate>,
}

impl From<Book> for GenreReportRow {
    fn from(book: Book) -> Self {
        Self {
            title: book.title,
            author: book.author,
            genre: book.genre_name.unwrap_or_default(),
            isbn: book.isbn,
            publisher: book.publisher,
            published_on: book.published_on,
        }
    }
}

/// Books belonging to a set of genres, ordered by genre name then title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreReport {
    /// Genres the report covers, ordered by name.
    pub genres: Vec<Genre>,
    pub rows: Vec<GenreReportRow>,
    pub generated_at: DateTime<Utc>,
}

impl GenreReport {
    pub fn new(genres: Vec<Genre>, books: Vec<Book>) -> Self {
        Self {
            genres,
            rows: books.into_iter().map(GenreReportRow::from).collect(),
            generated_at: Utc::now(),
        }
    }

    pub fn total_books(&self) -> usize {
        self.rows.len()
    }

    /// Number of rows for the genre named `name`.
    pub fn count_for(&self, name: &str) -> usize {
        self.rows.iter().filter(|row| row.genre == name).count()
    }
}
