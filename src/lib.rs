#![doc = "The `shelfkeeper` library crate."]
#![doc = ""]
#![doc = "Domain models, the lending workflows, authentication, routing configuration, and"]
#![doc = "error handling for the Shelfkeeper library-management service. The binary"]
#![doc = "(`main.rs`) builds the actix-web application out of these pieces."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

/// Schema migrations embedded from `./migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use crate::error::AppError;
