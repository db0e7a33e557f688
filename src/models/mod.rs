pub mod author;
pub mod book;
pub mod borrowing;
pub mod member;
pub mod user;

use chrono::{Datelike, Utc};
use validator::ValidationError;

pub use author::{Author, AuthorInput};
pub use book::{Availability, Book, BookInput, BookQuery, Genre};
pub use borrowing::{BorrowRequest, BorrowingQuery, BorrowingRecord};
pub use member::{MemberProfile, MembershipType, ProfileUpdate};
pub use user::Credentials;

/// Rejects years after the current calendar year (UTC).
///
/// The lower bound (year 1000) is a static `range` rule on the fields themselves; this check
/// covers the upper bound, which moves every January.
pub fn validate_not_future_year(year: i32) -> Result<(), ValidationError> {
    if year > Utc::now().year() {
        let mut err = ValidationError::new("year_in_future");
        err.message = Some(format!("Year must not be later than {}", Utc::now().year()).into());
        return Err(err);
    }
    Ok(())
}
