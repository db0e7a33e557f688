use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{BorrowRequest, BorrowingQuery},
    services::LendingService,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use uuid::Uuid;

/// Lists the caller's borrowing records, newest first.
///
/// ## Query Parameters:
/// - `returned` (optional): `false` for open loans only, `true` for closed ones.
/// - `overdue` (optional): `true` for open loans past their due date.
#[get("")]
pub async fn get_borrowings(
    lending: web::Data<LendingService>,
    user: AuthenticatedUser,
    query_params: web::Query<BorrowingQuery>,
) -> Result<impl Responder, AppError> {
    let member_id = lending.member_id(user.user_id).await?;
    let records = lending.list_for_member(member_id, &query_params).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Borrows one copy of a book for the caller.
///
/// ## Responses:
/// - `201 Created`: The new `BorrowingRecord`, due after the configured loan period.
/// - `400 Bad Request`: No copy available, or the caller already has this book.
/// - `401 Unauthorized`: No valid token.
/// - `404 Not Found`: Unknown book, or the account has no member profile.
#[post("")]
pub async fn borrow_book(
    lending: web::Data<LendingService>,
    user: AuthenticatedUser,
    borrow_data: web::Json<BorrowRequest>,
) -> Result<impl Responder, AppError> {
    let member_id = lending.member_id(user.user_id).await?;
    let record = lending.borrow(member_id, borrow_data.book_id).await?;
    Ok(HttpResponse::Created().json(record))
}

/// Retrieves one of the caller's borrowing records.
#[get("/{id}")]
pub async fn get_borrowing(
    lending: web::Data<LendingService>,
    user: AuthenticatedUser,
    record_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let member_id = lending.member_id(user.user_id).await?;
    let record = lending
        .get_for_member(member_id, record_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Returns a borrowed copy.
///
/// ## Responses:
/// - `200 OK`: The closed `BorrowingRecord`.
/// - `400 Bad Request`: The record was already returned.
/// - `403 Forbidden`: The record belongs to another member.
/// - `404 Not Found`: Unknown record.
#[post("/{id}/return")]
pub async fn return_book(
    lending: web::Data<LendingService>,
    user: AuthenticatedUser,
    record_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let member_id = lending.member_id(user.user_id).await?;
    let record = lending
        .return_loan(member_id, record_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}
