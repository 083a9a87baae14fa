//! Custom Axum extractors.
//!
//! - [`AuthUser`]: the `{user_id, role}` pair the upstream auth layer put on
//!   the request, as a [`Caller`]
//! - [`CorrelationId`]: the request's correlation id
//! - [`ApiJson`], [`ApiQuery`], [`ApiPath`]: the stock extractors with
//!   rejections rendered as [`AppError`] bodies
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     AuthUser(caller): AuthUser,
//!     ApiPath(id): ApiPath<BookingId>,
//! ) -> Result<Json<Value>, AppError> {
//!     let booking = state.bookings.get(&caller, id).await?;
//!     Ok(Json(json!({ "booking": booking })))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use rental_core::{Caller, UserId, caller::Role};
use uuid::Uuid;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the authenticated user's role (`user` or `admin`).
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The authenticated caller.
///
/// Authentication happens upstream; this only reads the identity it
/// forwarded. A missing or malformed id is a 401. A missing role means
/// `user`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("User not authenticated"))?
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("User not authenticated"))?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => Role::User,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|s| s.parse::<Role>().ok())
                .ok_or_else(|| AppError::unauthorized("Unrecognised role"))?,
        };

        Ok(Self(Caller { user_id, role }))
    }
}

/// Correlation ID for request tracing.
///
/// Reads the id the correlation middleware stored, falls back to the
/// `X-Correlation-ID` header, and generates a fresh one otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }
        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// JSON body extractor whose rejection is an [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejection is an [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor whose rejection is an [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts(headers: &[(&str, String)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }
        let (parts, ()) = builder.body(()).expect("Valid request").into_parts();
        parts
    }

    #[tokio::test]
    async fn test_auth_user_reads_id_and_role() {
        let id = UserId::new();
        let mut parts = parts(&[
            (USER_ID_HEADER, id.to_string()),
            (USER_ROLE_HEADER, "admin".to_string()),
        ]);

        let AuthUser(caller) = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(caller, Caller::admin(id));
    }

    #[tokio::test]
    async fn test_auth_user_defaults_to_user_role() {
        let id = UserId::new();
        let mut parts = parts(&[(USER_ID_HEADER, id.to_string())]);

        let AuthUser(caller) = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert!(!caller.is_admin());
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let mut parts = parts(&[]);
        let err = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("Should reject");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let mut parts = parts_with_bad_id();
        let err = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("Should reject");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    fn parts_with_bad_id() -> Parts {
        parts(&[(USER_ID_HEADER, "not-a-uuid".to_string())])
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = parts(&[(CORRELATION_ID_HEADER, uuid.to_string())]);

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let mut parts = parts(&[]);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_ne!(correlation_id.0, Uuid::nil());
    }
}
