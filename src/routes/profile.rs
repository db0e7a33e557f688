use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{MemberProfile, ProfileUpdate},
};
use actix_web::{get, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

const PROFILE_SELECT: &str = "SELECT m.id, m.user_id, u.username, u.email, m.phone_number, \
     m.address, m.membership_type, m.is_active_member, m.created_at, m.updated_at \
     FROM member_profiles m JOIN users u ON u.id = m.user_id";

async fn fetch_profile(pool: &PgPool, user_id: i32) -> Result<MemberProfile, AppError> {
    let sql = format!("{} WHERE m.user_id = $1", PROFILE_SELECT);
    sqlx::query_as::<_, MemberProfile>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Member profile not found".into()))
}

/// Retrieves the caller's member profile.
///
/// ## Responses:
/// - `200 OK`: The `MemberProfile` as JSON.
/// - `401 Unauthorized`: No valid token.
/// - `404 Not Found`: The account has no member profile (e.g. a staff-only account).
#[get("")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let profile = fetch_profile(&pool, user.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Updates the caller's phone number, address, and membership type.
///
/// ## Responses:
/// - `200 OK`: The updated `MemberProfile`.
/// - `400 Bad Request`: The phone number belongs to another member.
/// - `401 Unauthorized`, `404 Not Found`: As for `get_profile`.
/// - `422 Unprocessable Entity`: Field validation failed.
#[put("")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    profile_data: web::Json<ProfileUpdate>,
) -> Result<impl Responder, AppError> {
    profile_data.validate()?;

    let phone_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM member_profiles WHERE phone_number = $1 AND user_id <> $2)",
    )
    .bind(&profile_data.phone_number)
    .bind(user.user_id)
    .fetch_one(&**pool)
    .await?;

    if phone_taken {
        return Err(AppError::BadRequest("Phone number already registered".into()));
    }

    let result = sqlx::query(
        "UPDATE member_profiles \
         SET phone_number = $1, address = $2, membership_type = $3, updated_at = NOW() \
         WHERE user_id = $4",
    )
    .bind(&profile_data.phone_number)
    .bind(&profile_data.address)
    .bind(profile_data.membership_type)
    .bind(user.user_id)
    .execute(&**pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Member profile not found".into()));
    }

    let profile = fetch_profile(&pool, user.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}
