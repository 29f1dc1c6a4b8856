//! Types for the book catalog.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Book identifier (the "tag"), generated by the store on insert.
pub type BookId = i64;

/// Genre identifier.
pub type GenreId = i64;

/// Required length of an ISBN, in digits.
pub const ISBN_LENGTH: usize = 13;

/// A catalogued book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique tag.
    pub id: BookId,
    pub title: String,
    /// Author(s), free text.
    pub author: String,
    pub publisher: String,
    pub genre_id: GenreId,
    /// Name of the referenced genre (joined on read).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre_name: Option<String>,
    /// 13 ASCII digits.
    pub isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_on: Option<NaiveDate>,
    /// When the book was added to the catalog.
    pub created_at: DateTime<Utc>,
    /// When the book was last edited.
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting or updating a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub genre_id: GenreId,
    pub isbn: String,
    #[serde(default)]
    pub published_on: Option<NaiveDate>,
}

impl NewBook {
    /// Trim text fields and check the data-entry rules.
    ///
    /// Title, author and publisher must be non-blank; the ISBN must be
    /// exactly [`ISBN_LENGTH`] ASCII digits.
    pub fn normalized(&self) -> Result<NewBook, ValidationError> {
        let title = required("title", &self.title)?;
        let author = required("author", &self.author)?;
        let publisher = required("publisher", &self.publisher)?;
        let isbn = validate_isbn(&self.isbn)?;

        Ok(NewBook {
            title,
            author,
            publisher,
            genre_id: self.genre_id,
            isbn,
            published_on: self.published_on,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Check that `isbn` is exactly 13 digits, returning the trimmed value.
pub fn validate_isbn(isbn: &str) -> Result<String, ValidationError> {
    let isbn = isbn.trim();
    let length = isbn.chars().count();
    if length != ISBN_LENGTH {
        return Err(ValidationError::IsbnLength(length));
    }
    if !isbn.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::IsbnNotNumeric(isbn.to_string()));
    }
    Ok(isbn.to_string())
}

/// Check a genre name, returning the trimmed value.
pub fn validate_genre_name(name: &str) -> Result<String, ValidationError> {
    required("name", name)
}

/// A literary genre, shared by many books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// Query for searching the catalog.
///
/// Every given filter must hold. Text filters match a case-insensitive
/// substring; `%`, `_` and `\` in them are literal characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookQuery {
    /// Free text matched against title, author, publisher, ISBN, genre name,
    /// tag and publication date.
    #[serde(default)]
    pub text: Option<String>,
    /// Restrict to one genre.
    #[serde(default)]
    pub genre_id: Option<GenreId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// ISBN fragment.
    #[serde(default)]
    pub isbn: Option<String>,
    /// Genre name fragment.
    #[serde(default)]
    pub genre_name: Option<String>,
    /// Exact publication date.
    #[serde(default)]
    pub published_on: Option<NaiveDate>,
    /// Maximum results.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Offset for pagination.
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    100
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            text: None,
            genre_id: None,
            title: None,
            author: None,
            isbn: None,
            genre_name: None,
            published_on: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl BookQuery {
    /// Match books containing `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Restrict to one genre.
    pub fn with_genre(mut self, genre_id: GenreId) -> Self {
        self.genre_id = Some(genre_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_genre_name(mut self, name: impl Into<String>) -> Self {
        self.genre_name = Some(name.into());
        self
    }

    pub fn with_published_on(mut self, date: NaiveDate) -> Self {
        self.published_on = Some(date);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Trimmed filter value, or `None` when absent or blank.
pub fn filter_term(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

/// Catalog statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_books: u64,
    pub total_genres: u64,
}

/// Rejected catalog input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("ISBN must have {ISBN_LENGTH} digits, got {0} characters")]
    IsbnLength(usize),

    #[error("ISBN must contain only digits: {0}")]
    IsbnNotNumeric(String),

    #[error("Genre {0} does not exist")]
    UnknownGenre(GenreId),
}
