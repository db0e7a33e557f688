use crate::{
    auth::StaffUser,
    error::AppError,
    models::{Author, AuthorInput},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

/// Query parameters for listing authors.
#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    /// Case-insensitive match on the author's name.
    pub search: Option<String>,
}

/// Lists authors ordered by name. Public.
#[get("")]
pub async fn get_authors(
    pool: web::Data<PgPool>,
    query_params: web::Query<AuthorQuery>,
) -> Result<impl Responder, AppError> {
    let authors = match &query_params.search {
        Some(search) => {
            sqlx::query_as::<_, Author>(
                "SELECT id, name, bio, birth_year FROM authors WHERE name ILIKE $1 ORDER BY name, id",
            )
            .bind(format!("%{}%", search))
            .fetch_all(&**pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Author>(
                "SELECT id, name, bio, birth_year FROM authors ORDER BY name, id",
            )
            .fetch_all(&**pool)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(authors))
}

/// Adds an author. Staff only.
#[post("")]
pub async fn create_author(
    pool: web::Data<PgPool>,
    _staff: StaffUser,
    author_data: web::Json<AuthorInput>,
) -> Result<impl Responder, AppError> {
    author_data.validate()?;

    let author = sqlx::query_as::<_, Author>(
        "INSERT INTO authors (name, bio, birth_year) VALUES ($1, $2, $3) \
         RETURNING id, name, bio, birth_year",
    )
    .bind(&author_data.name)
    .bind(&author_data.bio)
    .bind(author_data.birth_year)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(author))
}

/// Retrieves one author. Public.
#[get("/{id}")]
pub async fn get_author(
    pool: web::Data<PgPool>,
    author_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let author =
        sqlx::query_as::<_, Author>("SELECT id, name, bio, birth_year FROM authors WHERE id = $1")
            .bind(author_id.into_inner())
            .fetch_optional(&**pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Author not found".into()))?;

    Ok(HttpResponse::Ok().json(author))
}

/// Replaces an author's fields. Staff only.
#[put("/{id}")]
pub async fn update_author(
    pool: web::Data<PgPool>,
    _staff: StaffUser,
    author_id: web::Path<i32>,
    author_data: web::Json<AuthorInput>,
) -> Result<impl Responder, AppError> {
    author_data.validate()?;

    let author = sqlx::query_as::<_, Author>(
        "UPDATE authors SET name = $1, bio = $2, birth_year = $3 WHERE id = $4 \
         RETURNING id, name, bio, birth_year",
    )
    .bind(&author_data.name)
    .bind(&author_data.bio)
    .bind(author_data.birth_year)
    .bind(author_id.into_inner())
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Author not found".into()))?;

    Ok(HttpResponse::Ok().json(author))
}

/// Deletes an author together with their books. Staff only.
///
/// Refused with `400` when any of those books has borrowing records.
#[delete("/{id}")]
pub async fn delete_author(
    pool: web::Data<PgPool>,
    _staff: StaffUser,
    author_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let author_id = author_id.into_inner();

    let result = sqlx::query("DELETE FROM authors WHERE id = $1")
        .bind(author_id)
        .execute(&**pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::BadRequest(_) => AppError::BadRequest(
                "Cannot delete an author whose books have borrowing records".into(),
            ),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Author not found".into()));
    }

    log::info!("removed author {} and their books", author_id);
    Ok(HttpResponse::NoContent().finish())
}
