use sqlx::FromRow;

/// The columns login needs to check a password and mint a token.
#[derive(Debug, FromRow)]
pub struct Credentials {
    pub id: i32,
    pub password_hash: String,
    pub is_staff: bool,
}
