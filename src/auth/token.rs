use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the account's user id.
    pub sub: i32,
    /// Whether the account may mutate the catalog.
    #[serde(default)]
    pub is_staff: bool,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
}

/// Generates a signed JWT for an account.
///
/// # Arguments
/// * `user_id` - The account the token identifies.
/// * `is_staff` - Carried in the claims so the staff check needs no database lookup.
/// * `secret` - HS256 signing secret.
/// * `ttl_hours` - Lifetime of the token.
///
/// # Returns
/// The encoded token, or `AppError::InternalServerError` if the lifetime is not a
/// positive, representable number of hours or encoding fails.
pub fn generate_token(
    user_id: i32,
    is_staff: bool,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, AppError> {
    let expiration = chrono::Duration::try_hours(ttl_hours)
        .filter(|ttl| *ttl > chrono::Duration::zero())
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::InternalServerError(format!("Token lifetime of {} hours is out of range", ttl_hours))
        })?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        is_staff,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies a JWT string and decodes its claims.
///
/// Signature and expiration are checked with the default HS256 validation.
/// Returns `AppError::Unauthorized` if the token is malformed, forged, or expired.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}
