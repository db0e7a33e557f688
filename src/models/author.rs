use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::validate_not_future_year;

/// Represents an author as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub bio: Option<String>,
    pub birth_year: i32,
}

/// Input for creating or replacing an author.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_author_input", skip_on_field_errors = false))]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    /// Between 1000 and the current year.
    #[validate(range(min = 1000))]
    pub birth_year: i32,
}

fn validate_author_input(input: &AuthorInput) -> Result<(), ValidationError> {
    validate_not_future_year(input.birth_year)
}
