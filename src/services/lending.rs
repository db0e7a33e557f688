//! Borrow and return workflows.
//!
//! Both workflows keep two things in step: the book's available-copy counter and the
//! state of a borrowing record. Each runs in one database transaction that locks the
//! rows it reads (`SELECT ... FOR UPDATE`) before deciding, so concurrent requests for
//! the last copy of a book queue up on the book row and only the first one wins.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{borrowing::due_date, Availability, BorrowingQuery, BorrowingRecord},
};

const RECORD_SELECT: &str = "SELECT br.id, br.member_id, u.username AS user_name, br.book_id, \
     b.title AS book_title, br.borrow_date, br.due_date, br.return_date, br.is_returned \
     FROM borrowing_records br \
     JOIN member_profiles m ON m.id = br.member_id \
     JOIN users u ON u.id = m.user_id \
     JOIN books b ON b.id = br.book_id";

#[derive(Clone)]
pub struct LendingService {
    pool: PgPool,
    loan_period_days: i64,
}

impl LendingService {
    pub fn new(pool: PgPool, loan_period_days: i64) -> Self {
        Self {
            pool,
            loan_period_days,
        }
    }

    /// Resolves the member profile owned by an account.
    pub async fn member_id(&self, user_id: i32) -> Result<i32, AppError> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM member_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Member profile not found".into()))
    }

    /// Lends one copy of `book_id` to `member_id`.
    ///
    /// Fails with `BadRequest` when no copy is on the shelf or when the member already
    /// holds an open loan of the same book; nothing is written in either case.
    pub async fn borrow(&self, member_id: i32, book_id: Uuid) -> Result<BorrowingRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut availability = lock_book(&mut tx, book_id).await?;
        if let Err(err) = availability.checkout() {
            log::warn!("borrow rejected: book {} has no available copies", book_id);
            return Err(err);
        }

        let has_open_loan: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowing_records \
             WHERE member_id = $1 AND book_id = $2 AND NOT is_returned)",
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if has_open_loan {
            log::warn!(
                "borrow rejected: member {} already holds book {}",
                member_id,
                book_id
            );
            return Err(AppError::BadRequest(
                "You already borrowed this book and did not return it.".into(),
            ));
        }

        let record_id = Uuid::new_v4();
        let borrowed_at = Utc::now();
        let due_at = due_date(borrowed_at, self.loan_period_days)?;

        sqlx::query(
            "INSERT INTO borrowing_records (id, member_id, book_id, borrow_date, due_date) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record_id)
        .bind(member_id)
        .bind(book_id)
        .bind(borrowed_at)
        .bind(due_at)
        .execute(&mut *tx)
        .await?;

        store_available_copies(&mut tx, book_id, availability).await?;

        let record = fetch_record(&mut tx, record_id).await?;
        tx.commit().await?;

        log::info!(
            "member {} borrowed book {} (record {}, {} copies left)",
            member_id,
            book_id,
            record.id,
            availability.available_copies
        );
        Ok(record)
    }

    /// Closes `record_id` on behalf of `member_id` and puts the copy back on the shelf.
    ///
    /// A missing record is `NotFound`, someone else's record is `Forbidden`, and an
    /// already-returned record is `BadRequest` with no change to the book.
    pub async fn return_loan(
        &self,
        member_id: i32,
        record_id: Uuid,
    ) -> Result<BorrowingRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{} WHERE br.id = $1 FOR UPDATE OF br", RECORD_SELECT);
        let mut record = sqlx::query_as::<_, BorrowingRecord>(&sql)
            .bind(record_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Borrowing record not found".into()))?;

        if record.member_id != member_id {
            return Err(AppError::Forbidden(
                "You do not have permission to return this borrowing.".into(),
            ));
        }

        if let Err(err) = record.mark_returned(Utc::now()) {
            log::warn!("return rejected: record {} is already returned", record_id);
            return Err(err);
        }

        sqlx::query(
            "UPDATE borrowing_records SET is_returned = TRUE, return_date = $1 WHERE id = $2",
        )
        .bind(record.return_date)
        .bind(record.id)
        .execute(&mut *tx)
        .await?;

        let mut availability = lock_book(&mut tx, record.book_id).await?;
        availability.checkin();
        store_available_copies(&mut tx, record.book_id, availability).await?;

        // Read back what Postgres stored so the response matches later reads.
        let record = fetch_record(&mut tx, record.id).await?;
        tx.commit().await?;

        log::info!(
            "member {} returned book {} (record {})",
            member_id,
            record.book_id,
            record.id
        );
        Ok(record)
    }

    /// The member's borrowing history, newest first.
    pub async fn list_for_member(
        &self,
        member_id: i32,
        query: &BorrowingQuery,
    ) -> Result<Vec<BorrowingRecord>, AppError> {
        let mut sql = format!("{} WHERE br.member_id = $1", RECORD_SELECT);
        if query.returned.is_some() {
            sql.push_str(" AND br.is_returned = $2");
        }
        sql.push_str(" ORDER BY br.borrow_date DESC");

        let mut query_builder = sqlx::query_as::<_, BorrowingRecord>(&sql).bind(member_id);
        if let Some(returned) = query.returned {
            query_builder = query_builder.bind(returned);
        }

        let mut records = query_builder.fetch_all(&self.pool).await?;
        if let Some(overdue) = query.overdue {
            let now = Utc::now();
            records.retain(|record| record.is_overdue(now) == overdue);
        }
        Ok(records)
    }

    /// One of the member's records. Records of other members read as missing.
    pub async fn get_for_member(
        &self,
        member_id: i32,
        record_id: Uuid,
    ) -> Result<BorrowingRecord, AppError> {
        let sql = format!("{} WHERE br.id = $1 AND br.member_id = $2", RECORD_SELECT);
        sqlx::query_as::<_, BorrowingRecord>(&sql)
            .bind(record_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Borrowing record not found".into()))
    }
}

/// Locks the book row for the rest of the transaction and reads its copy counts.
async fn lock_book(
    tx: &mut Transaction<'_, Postgres>,
    book_id: Uuid,
) -> Result<Availability, AppError> {
    let (total_copies, available_copies) = sqlx::query_as::<_, (i32, i32)>(
        "SELECT total_copies, available_copies FROM books WHERE id = $1 FOR UPDATE",
    )
    .bind(book_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Book not found".into()))?;

    Ok(Availability {
        total_copies,
        available_copies,
    })
}

async fn store_available_copies(
    tx: &mut Transaction<'_, Postgres>,
    book_id: Uuid,
    availability: Availability,
) -> Result<(), AppError> {
    sqlx::query("UPDATE books SET available_copies = $1 WHERE id = $2")
        .bind(availability.available_copies)
        .bind(book_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn fetch_record(
    tx: &mut Transaction<'_, Postgres>,
    record_id: Uuid,
) -> Result<BorrowingRecord, AppError> {
    let sql = format!("{} WHERE br.id = $1", RECORD_SELECT);
    Ok(sqlx::query_as::<_, BorrowingRecord>(&sql)
        .bind(record_id)
        .fetch_one(&mut **tx)
        .await?)
}
