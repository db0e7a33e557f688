use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validate_not_future_year;
use crate::error::AppError;

lazy_static! {
    static ref ISBN_REGEX: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

/// Genre of a book.
/// Corresponds to the `book_genre` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "book_genre", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Fiction,
    NonFiction,
    Science,
    History,
    Biography,
    Fantasy,
    Mystery,
    Romance,
    Children,
    Other,
}

/// A book as returned by the API, joined with its author's name.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author_id: i32,
    pub author_name: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: Genre,
    pub total_copies: i32,
    /// Maintained by the lending workflows; never written through the catalog API.
    pub available_copies: i32,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing a book. It has no `available_copies` field.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_book_input", skip_on_field_errors = false))]
pub struct BookInput {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    pub author_id: i32,
    #[validate(
        length(min = 1, max = 20),
        regex(path = "ISBN_REGEX", message = "ISBN must contain only numbers.")
    )]
    pub isbn: String,
    #[validate(range(min = 1000))]
    pub publication_year: i32,
    pub genre: Genre,
    #[validate(range(min = 1))]
    pub total_copies: i32,
    #[validate(length(max = 500))]
    pub cover_image: Option<String>,
}

fn validate_book_input(input: &BookInput) -> Result<(), ValidationError> {
    validate_not_future_year(input.publication_year)
}

impl BookInput {
    /// Copy counts for a newly catalogued book: every copy starts on the shelf.
    pub fn initial_availability(&self) -> Availability {
        Availability::new(self.total_copies)
    }
}

/// Query parameters for listing books.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BookQuery {
    pub genre: Option<Genre>,
    pub author_id: Option<i32>,
    /// `true` keeps only books with a copy on the shelf, `false` only fully lent ones.
    pub available: Option<bool>,
    /// Case-insensitive match against title or ISBN.
    pub search: Option<String>,
}

/// Copy bookkeeping for one book.
///
/// Holds `0 <= available_copies <= total_copies`. Each successful checkout takes
/// exactly one copy and each checkin puts back at most one, so after N checkouts and
/// M checkins (M <= N) the count is `total_copies - N + M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub total_copies: i32,
    pub available_copies: i32,
}

impl Availability {
    pub fn new(total_copies: i32) -> Self {
        Self {
            total_copies,
            available_copies: total_copies,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Takes one copy off the shelf, or fails without changing anything.
    pub fn checkout(&mut self) -> Result<(), AppError> {
        if !self.is_available() {
            return Err(AppError::BadRequest(
                "This book is not available for borrowing.".into(),
            ));
        }
        self.available_copies -= 1;
        Ok(())
    }

    /// Puts one copy back, never exceeding `total_copies`.
    pub fn checkin(&mut self) {
        if self.available_copies < self.total_copies {
            self.available_copies += 1;
        }
    }

    /// Applies a catalog edit of `total_copies`.
    ///
    /// The available count is left as it is; a total smaller than it would break the
    /// bound and is rejected.
    pub fn with_total(self, total_copies: i32) -> Result<Self, AppError> {
        if total_copies < self.available_copies {
            return Err(AppError::BadRequest(format!(
                "total_copies cannot be lower than the {} copies currently available",
                self.available_copies
            )));
        }
        Ok(Self {
            total_copies,
            available_copies: self.available_copies,
        })
    }
}
