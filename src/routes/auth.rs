use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, LoginRequest, RegisterRequest,
    },
    config::Config,
    error::AppError,
    models::Credentials,
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Register a new member
///
/// Creates the account and its member profile in one transaction and returns an
/// authentication token. Email, username, and phone number must all be unused.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let (email_taken, username_taken, phone_taken): (bool, bool, bool) = sqlx::query_as(
        "SELECT \
            EXISTS(SELECT 1 FROM users WHERE email = $1), \
            EXISTS(SELECT 1 FROM users WHERE username = $2), \
            EXISTS(SELECT 1 FROM member_profiles WHERE phone_number = $3)",
    )
    .bind(&register_data.email)
    .bind(&register_data.username)
    .bind(&register_data.phone_number)
    .fetch_one(&**pool)
    .await?;

    if email_taken {
        return Err(AppError::BadRequest("Email already registered".into()));
    }
    if username_taken {
        return Err(AppError::BadRequest("Username already taken".into()));
    }
    if phone_taken {
        return Err(AppError::BadRequest("Phone number already registered".into()));
    }

    let password_hash = hash_password(&register_data.password)?;

    // A concurrent registration can still win the race; the unique constraints turn
    // that into the same 400 through `From<sqlx::Error>`.
    let mut tx = pool.begin().await?;

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&register_data.username)
    .bind(&register_data.email)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO member_profiles (user_id, phone_number, address, membership_type) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(&register_data.phone_number)
    .bind(&register_data.address)
    .bind(register_data.membership_type)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!("registered member account {}", user_id);

    let token = generate_token(user_id, false, &config.jwt_secret, config.jwt_expiration_hours)?;

    Ok(HttpResponse::Created().json(AuthResponse { token, user_id }))
}

/// Login
///
/// Authenticates an account by email and password and returns an authentication token.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = sqlx::query_as::<_, Credentials>(
        "SELECT id, password_hash, is_staff FROM users WHERE email = $1",
    )
    .bind(&login_data.email)
    .fetch_optional(&**pool)
    .await?;

    match user {
        Some(user) if verify_password(&login_data.password, &user.password_hash)? => {
            let token = generate_token(
                user.id,
                user.is_staff,
                &config.jwt_secret,
                config.jwt_expiration_hours,
            )?;
            Ok(HttpResponse::Ok().json(AuthResponse {
                token,
                user_id: user.id,
            }))
        }
        _ => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}
