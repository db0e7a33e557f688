use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// A loan of one copy of a book to one member.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BorrowingRecord {
    pub id: Uuid,
    pub member_id: i32,
    /// Username of the borrowing member's account.
    pub user_name: String,
    pub book_id: Uuid,
    pub book_title: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub is_returned: bool,
}

impl BorrowingRecord {
    /// An open loan is one whose copy has not come back yet.
    pub fn is_open(&self) -> bool {
        !self.is_returned
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date < now
    }

    /// Closes the loan. A record is returned at most once; a second call fails and
    /// leaves the record untouched.
    pub fn mark_returned(&mut self, at: DateTime<Utc>) -> Result<(), AppError> {
        if self.is_returned {
            return Err(AppError::BadRequest(
                "This borrowing is already returned.".into(),
            ));
        }
        self.is_returned = true;
        self.return_date = Some(at);
        Ok(())
    }
}

/// Due date of a loan that starts at `borrowed_at`.
///
/// The period must be at least one day and the result must stay inside chrono's
/// representable range; anything else is a configuration error.
pub fn due_date(borrowed_at: DateTime<Utc>, loan_period_days: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_days(loan_period_days)
        .filter(|period| *period > Duration::zero())
        .and_then(|period| borrowed_at.checked_add_signed(period))
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Loan period of {} days is out of range",
                loan_period_days
            ))
        })
}

/// Body of a borrow request. The member is always the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub book_id: Uuid,
}

/// Query parameters for listing the caller's borrowings.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BorrowingQuery {
    pub returned: Option<bool>,
    /// `true` keeps only open loans past their due date, `false` drops them.
    pub overdue: Option<bool>,
}
