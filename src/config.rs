use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::AppError;

/// Runtime settings, read from the environment (and `.env` via `dotenv` in `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    /// Days between a borrow and its due date.
    pub loan_period_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,
            server_port: parsed_or("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_hours: bounded("JWT_EXPIRATION_HOURS", 24, 1..=8760)?,
            loan_period_days: bounded("LOAN_PERIOD_DAYS", 14, 1..=3650)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::InternalServerError(format!("{} must be set", key)))
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} must be a number", key))),
        Err(_) => Ok(default),
    }
}

/// Like `parsed_or`, but the value must also fall inside `range`.
fn bounded(key: &str, default: i64, range: RangeInclusive<i64>) -> Result<i64, AppError> {
    let value = parsed_or(key, default)?;
    if !range.contains(&value) {
        return Err(AppError::InternalServerError(format!(
            "{} must be between {} and {}",
            key,
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}
