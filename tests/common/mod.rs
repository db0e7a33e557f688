#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{http::header, test, web, App};
use dotenv::dotenv;
use serde_json::{json, Value};
use shelfkeeper::auth::{AuthMiddleware, AuthResponse};
use shelfkeeper::config::Config;
use shelfkeeper::routes::{self, health};
use shelfkeeper::services::LendingService;
use sqlx::PgPool;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "Password123!";

pub struct TestUser {
    pub id: i32,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

pub fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        database_max_connections: 10,
        server_port: 0,
        server_host: "127.0.0.1".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiration_hours: 1,
        loan_period_days: 14,
    }
}

/// Connects to `DATABASE_URL` and applies the migrations.
pub async fn test_pool() -> PgPool {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    shelfkeeper::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations on test DB");
    pool
}

pub async fn init_app(
    pool: &PgPool,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    let database_url = std::env::var("DATABASE_URL").unwrap_or_default();
    let config = test_config(database_url);
    let lending = LendingService::new(pool.clone(), config.loan_period_days);

    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(lending))
            .app_data(web::Data::new(config))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(TEST_JWT_SECRET))
                    .configure(routes::config),
            ),
    )
    .await
}

/// Suffix that keeps usernames, emails, phone numbers and ISBNs unique across runs.
pub fn unique_suffix() -> String {
    format!("{:010}", Uuid::new_v4().as_u128() % 10_000_000_000)
}

pub fn unique_isbn() -> String {
    format!("978{}", unique_suffix())
}

pub async fn register_member(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    prefix: &str,
) -> TestUser {
    let suffix = unique_suffix();
    let email = format!("{}_{}@example.com", prefix, suffix);
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "username": format!("{}_{}", prefix, suffix),
            "email": email,
            "password": PASSWORD,
            "phone_number": format!("+1{}", suffix),
            "address": "1 Library Way",
            "membership_type": "basic"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert!(
        status.is_success(),
        "Failed to register {}. Status: {}. Body: {}",
        email,
        status,
        String::from_utf8_lossy(&body)
    );
    let auth: AuthResponse =
        serde_json::from_slice(&body).expect("Failed to parse registration response");

    TestUser {
        id: auth.user_id,
        email,
        token: auth.token,
    }
}

pub async fn login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
) -> AuthResponse {
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(resp.status().is_success(), "login failed for {}", email);
    test::read_body_json(resp).await
}

/// Registers an account, flags it as staff, and logs in again for a staff token.
pub async fn register_staff(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    pool: &PgPool,
) -> TestUser {
    let user = register_member(app, "staff").await;
    sqlx::query("UPDATE users SET is_staff = TRUE WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await
        .expect("Failed to promote staff user");
    let auth = login(app, &user.email).await;
    TestUser {
        token: auth.token,
        ..user
    }
}

pub async fn create_author(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    staff: &TestUser,
) -> i32 {
    let req = test::TestRequest::post()
        .uri("/api/authors")
        .insert_header(staff.bearer())
        .set_json(&json!({
            "name": format!("Author {}", unique_suffix()),
            "bio": "Writes books.",
            "birth_year": 1950
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let author: Value = test::read_body_json(resp).await;
    author["id"].as_i64().expect("author id") as i32
}

pub async fn create_book(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    staff: &TestUser,
    author_id: i32,
    total_copies: i32,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/api/books")
        .insert_header(staff.bearer())
        .set_json(&json!({
            "title": format!("Book {}", unique_suffix()),
            "author_id": author_id,
            "isbn": unique_isbn(),
            "publication_year": 1999,
            "genre": "fiction",
            "total_copies": total_copies
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Failed to create book. Body: {}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).expect("Failed to parse book")
}

pub async fn fetch_book(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    book_id: &str,
) -> Value {
    let req = test::TestRequest::get()
        .uri(&format!("/api/books/{}", book_id))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(resp.status().is_success());
    test::read_body_json(resp).await
}

/// Removes test accounts; profiles and their borrowing records cascade.
pub async fn cleanup_users(pool: &PgPool, users: &[&TestUser]) {
    for user in users {
        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(pool)
            .await;
    }
}

/// Removes a test author; their books cascade once no borrowing records point at them.
pub async fn cleanup_author(pool: &PgPool, author_id: i32) {
    let _ = sqlx::query("DELETE FROM authors WHERE id = $1")
        .bind(author_id)
        .execute(pool)
        .await;
}
