use crate::{
    auth::StaffUser,
    error::AppError,
    models::{Availability, Book, BookInput, BookQuery},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use validator::Validate;

const BOOK_SELECT: &str = "SELECT b.id, b.title, b.author_id, a.name AS author_name, b.isbn, \
     b.publication_year, b.genre, b.total_copies, b.available_copies, b.cover_image, b.created_at \
     FROM books b JOIN authors a ON a.id = b.author_id";

async fn fetch_book<'e, E>(executor: E, id: Uuid) -> Result<Book, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let sql = format!("{} WHERE b.id = $1", BOOK_SELECT);
    sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".into()))
}

async fn ensure_author_exists(pool: &PgPool, author_id: i32) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
        .bind(author_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::BadRequest(format!(
            "Author {} does not exist",
            author_id
        )));
    }
    Ok(())
}

/// Lists the catalog. Public.
///
/// ## Query Parameters:
/// - `genre` (optional): e.g. `fiction`, `non_fiction`.
/// - `author_id` (optional): Books by one author.
/// - `available` (optional): `true` for books with a copy on the shelf, `false` for fully lent ones.
/// - `search` (optional): Case-insensitive match on title or ISBN.
///
/// Books are ordered by title.
#[get("")]
#[allow(unused_assignments)]
pub async fn get_books(
    pool: web::Data<PgPool>,
    query_params: web::Query<BookQuery>,
) -> Result<impl Responder, AppError> {
    let mut sql = format!("{} WHERE TRUE", BOOK_SELECT);
    let mut param_count = 1;

    if query_params.genre.is_some() {
        sql.push_str(&format!(" AND b.genre = ${}", param_count));
        param_count += 1;
    }
    if query_params.author_id.is_some() {
        sql.push_str(&format!(" AND b.author_id = ${}", param_count));
        param_count += 1;
    }
    match query_params.available {
        Some(true) => sql.push_str(" AND b.available_copies > 0"),
        Some(false) => sql.push_str(" AND b.available_copies = 0"),
        None => {}
    }
    if query_params.search.is_some() {
        sql.push_str(&format!(
            " AND (b.title ILIKE ${0} OR b.isbn ILIKE ${0})",
            param_count
        ));
    }

    sql.push_str(" ORDER BY b.title, b.created_at");

    let mut query_builder = sqlx::query_as::<_, Book>(&sql);

    if let Some(genre) = query_params.genre {
        query_builder = query_builder.bind(genre);
    }
    if let Some(author_id) = query_params.author_id {
        query_builder = query_builder.bind(author_id);
    }
    if let Some(search) = &query_params.search {
        query_builder = query_builder.bind(format!("%{}%", search));
    }

    let books = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(books))
}

/// Adds a book to the catalog. Staff only.
///
/// Every copy starts on the shelf: `available_copies` is set to `total_copies`.
///
/// ## Responses:
/// - `201 Created`: The new `Book`.
/// - `400 Bad Request`: Unknown author or duplicate ISBN.
/// - `401 Unauthorized` / `403 Forbidden`: Not signed in / not staff.
/// - `422 Unprocessable Entity`: Field validation failed.
#[post("")]
pub async fn create_book(
    pool: web::Data<PgPool>,
    _staff: StaffUser,
    book_data: web::Json<BookInput>,
) -> Result<impl Responder, AppError> {
    book_data.validate()?;
    ensure_author_exists(&pool, book_data.author_id).await?;

    let id = Uuid::new_v4();
    let availability = book_data.initial_availability();

    sqlx::query(
        "INSERT INTO books (id, title, author_id, isbn, publication_year, genre, \
         total_copies, available_copies, cover_image) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(&book_data.title)
    .bind(book_data.author_id)
    .bind(&book_data.isbn)
    .bind(book_data.publication_year)
    .bind(book_data.genre)
    .bind(availability.total_copies)
    .bind(availability.available_copies)
    .bind(&book_data.cover_image)
    .execute(&**pool)
    .await?;

    log::info!("catalogued book {} ({} copies)", id, availability.total_copies);

    let book = fetch_book(&**pool, id).await?;
    Ok(HttpResponse::Created().json(book))
}

/// Retrieves one book. Public.
#[get("/{id}")]
pub async fn get_book(
    pool: web::Data<PgPool>,
    book_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let book = fetch_book(&**pool, book_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(book))
}

/// Replaces a book's catalog fields. Staff only.
///
/// `available_copies` is not touched. Lowering `total_copies` below the number of
/// copies currently on the shelf is refused with `400`. The row is locked while the
/// check runs so a concurrent borrow or return cannot slip in between.
#[put("/{id}")]
pub async fn update_book(
    pool: web::Data<PgPool>,
    _staff: StaffUser,
    book_id: web::Path<Uuid>,
    book_data: web::Json<BookInput>,
) -> Result<impl Responder, AppError> {
    book_data.validate()?;
    ensure_author_exists(&pool, book_data.author_id).await?;
    let book_uuid = book_id.into_inner();

    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, (i32, i32)>(
        "SELECT total_copies, available_copies FROM books WHERE id = $1 FOR UPDATE",
    )
    .bind(book_uuid)
    .fetch_optional(&mut *tx)
    .await?
    .map(|(total_copies, available_copies)| Availability {
        total_copies,
        available_copies,
    })
    .ok_or_else(|| AppError::NotFound("Book not found".into()))?;

    let resized = current.with_total(book_data.total_copies)?;

    sqlx::query(
        "UPDATE books \
         SET title = $1, author_id = $2, isbn = $3, publication_year = $4, genre = $5, \
             total_copies = $6, cover_image = $7 \
         WHERE id = $8",
    )
    .bind(&book_data.title)
    .bind(book_data.author_id)
    .bind(&book_data.isbn)
    .bind(book_data.publication_year)
    .bind(book_data.genre)
    .bind(resized.total_copies)
    .bind(&book_data.cover_image)
    .bind(book_uuid)
    .execute(&mut *tx)
    .await?;

    let book = fetch_book(&mut *tx, book_uuid).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(book))
}

/// Removes a book from the catalog. Staff only.
///
/// Books with any borrowing history are kept; deleting one is refused with `400`.
#[delete("/{id}")]
pub async fn delete_book(
    pool: web::Data<PgPool>,
    _staff: StaffUser,
    book_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let book_uuid = book_id.into_inner();

    let has_history: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrowing_records WHERE book_id = $1)")
            .bind(book_uuid)
            .fetch_one(&**pool)
            .await?;

    if has_history {
        return Err(AppError::BadRequest(
            "Cannot delete a book that has borrowing records".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(book_uuid)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Book not found".into()));
    }

    log::info!("removed book {} from the catalog", book_uuid);
    Ok(HttpResponse::NoContent().finish())
}
