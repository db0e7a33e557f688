use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// The account behind a verified bearer token.
///
/// `AuthMiddleware` stores the decoded `Claims` in the request extensions; this
/// extractor reads them back. Handlers that take an `AuthenticatedUser` argument are
/// therefore closed to anonymous callers, who get `401 Unauthorized`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub is_staff: bool,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticated(req).map_err(Into::into))
    }
}

/// An authenticated account with the staff flag set.
///
/// Catalog mutations take this extractor. Anonymous callers get `401`, members
/// without the flag get `403 Forbidden`. A token minted for staff is checked against
/// `users.is_staff` on every use, so revoking the flag takes effect immediately.
#[derive(Debug, Clone, Copy)]
pub struct StaffUser(pub AuthenticatedUser);

impl FromRequest for StaffUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claimed = authenticated(req);
        let pool = req.app_data::<web::Data<PgPool>>().cloned();
        Box::pin(async move { confirm_staff(claimed, pool).await.map_err(ActixError::from) })
    }
}

async fn confirm_staff(
    claimed: Result<AuthenticatedUser, AppError>,
    pool: Option<web::Data<PgPool>>,
) -> Result<StaffUser, AppError> {
    let user = claimed?;
    if !user.is_staff {
        return Err(not_staff());
    }

    let pool = pool
        .ok_or_else(|| AppError::InternalServerError("Database pool is not configured".into()))?;
    let still_staff: Option<bool> = sqlx::query_scalar("SELECT is_staff FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(pool.get_ref())
        .await?;

    if still_staff == Some(true) {
        Ok(StaffUser(user))
    } else {
        log::warn!(
            "staff token for account {} no longer carries staff rights",
            user.user_id
        );
        Err(not_staff())
    }
}

fn not_staff() -> AppError {
    AppError::Forbidden("Staff privileges are required for this action".into())
}

fn authenticated(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    req.extensions()
        .get::<Claims>()
        .map(|claims| AuthenticatedUser {
            user_id: claims.sub,
            is_staff: claims.is_staff,
        })
        .ok_or_else(|| AppError::Unauthorized("Authentication credentials were not provided".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;

    fn claims(sub: i32, is_staff: bool) -> Claims {
        Claims {
            sub,
            is_staff,
            exp: usize::MAX,
        }
    }

    #[actix_rt::test]
    async fn test_authenticated_user_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(claims(123, false));

        let mut payload = Payload::None;
        let user = AuthenticatedUser::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(user.user_id, 123);
        assert!(!user.is_staff);
    }

    #[actix_rt::test]
    async fn test_authenticated_user_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = AuthenticatedUser::from_request(&req, &mut payload)
            .await
            .err()
            .expect("anonymous request must not yield a user");
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_staff_user_extractor() {
        // Staff claims are confirmed against the database, which this request lacks.
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(claims(5, true));
        let mut payload = Payload::None;
        let err = StaffUser::from_request(&req, &mut payload)
            .await
            .err()
            .expect("staff claims need a database to confirm them");
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(claims(6, false));
        let mut payload = Payload::None;
        let err = StaffUser::from_request(&req, &mut payload)
            .await
            .err()
            .expect("members must not pass the staff check");
        assert_eq!(err.error_response().status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::default().to_http_request();
        let mut payload = Payload::None;
        let err = StaffUser::from_request(&req, &mut payload)
            .await
            .err()
            .expect("anonymous requests must not pass the staff check");
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
