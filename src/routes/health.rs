use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

/// Health check endpoint
///
/// Reports the service name, version, server time, and whether the database answers.
/// Mounted outside `/api`; `503 Service Unavailable` when the database is unreachable.
#[get("/health")]
pub async fn health(pool: web::Data<PgPool>) -> impl Responder {
    let database_ok = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&**pool)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            log::warn!("health check: database unreachable: {}", e);
            false
        }
    };

    let body = json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "database": if database_ok { "ok" } else { "unreachable" },
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now()
    });

    if database_ok {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
