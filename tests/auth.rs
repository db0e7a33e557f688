mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shelfkeeper::auth::AuthResponse;

use common::{cleanup_users, init_app, register_member, test_pool, unique_suffix, PASSWORD};

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let pool = test_pool().await;
    let app = init_app(&pool).await;

    let suffix = unique_suffix();
    let email = format!("reader_{}@example.com", suffix);
    let register_payload = json!({
        "username": format!("reader_{}", suffix),
        "email": email,
        "password": PASSWORD,
        "phone_number": format!("+44{}", suffix),
        "address": "10 Stack Street",
        "membership_type": "standard"
    });

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "Registration failed. Body: {:?}",
        String::from_utf8_lossy(&body)
    );
    let registered: AuthResponse = serde_json::from_slice(&body).unwrap();
    assert!(!registered.token.is_empty());

    // Same payload again: the email is taken.
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Email already registered");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(login.user_id, registered.user_id);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": "WrongPassword1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let _ = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(registered.user_id)
        .execute(&pool)
        .await;
}

#[actix_rt::test]
async fn test_duplicate_phone_number_is_rejected() {
    let pool = test_pool().await;
    let app = init_app(&pool).await;

    let first = register_member(&app, "phone").await;
    let profile_req = test::TestRequest::get()
        .uri("/api/profile")
        .insert_header(first.bearer())
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, profile_req).await;
    let taken_phone = profile["phone_number"].as_str().unwrap().to_string();

    let suffix = unique_suffix();
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "username": format!("phone_{}", suffix),
            "email": format!("phone_{}@example.com", suffix),
            "password": PASSWORD,
            "phone_number": taken_phone,
            "membership_type": "basic"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Phone number already registered");

    cleanup_users(&pool, &[&first]).await;
}

#[actix_rt::test]
async fn test_invalid_registration_payload() {
    let pool = test_pool().await;
    let app = init_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "username": "bad user!",
            "email": "not-an-email",
            "password": "short",
            "phone_number": "nope",
            "membership_type": "basic"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_rt::test]
async fn test_profile_requires_authentication() {
    let pool = test_pool().await;
    let app = init_app(&pool).await;

    let req = test::TestRequest::get().uri("/api/profile").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_profile_retrieve_and_update() {
    let pool = test_pool().await;
    let app = init_app(&pool).await;

    let member = register_member(&app, "profile").await;
    let other = register_member(&app, "profile").await;

    let req = test::TestRequest::get()
        .uri("/api/profile")
        .insert_header(member.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = test::read_body_json(resp).await;
    assert_eq!(profile["user_id"], member.id);
    assert_eq!(profile["email"], member.email.as_str());
    assert_eq!(profile["membership_type"], "basic");
    assert_eq!(profile["is_active_member"], true);

    let new_phone = format!("+33{}", unique_suffix());
    let req = test::TestRequest::put()
        .uri("/api/profile")
        .insert_header(member.bearer())
        .set_json(&json!({
            "phone_number": new_phone,
            "address": "2 New Address Road",
            "membership_type": "premium"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["phone_number"], new_phone.as_str());
    assert_eq!(updated["address"], "2 New Address Road");
    assert_eq!(updated["membership_type"], "premium");

    // The other member cannot take that phone number.
    let req = test::TestRequest::put()
        .uri("/api/profile")
        .insert_header(other.bearer())
        .set_json(&json!({
            "phone_number": new_phone,
            "membership_type": "basic"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    cleanup_users(&pool, &[&member, &other]).await;
}

#[actix_rt::test]
async fn test_garbage_token_is_rejected_even_on_public_routes() {
    let pool = test_pool().await;
    let app = init_app(&pool).await;

    let req = test::TestRequest::get()
        .uri("/api/books")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::try_call_service(&app, req).await;
    let status = match resp {
        Ok(resp) => resp.status(),
        Err(err) => err.as_response_error().status_code(),
    };
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
