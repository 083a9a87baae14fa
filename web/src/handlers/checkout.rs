//! `POST /checkout`.

use super::Envelope;
use crate::error::AppError;
use crate::extractors::{ApiJson, AuthUser, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rental_runtime::checkout::CheckoutRequest;

/// Turn the caller's cart into an order (201).
///
/// # Errors
///
/// 400 for validation, empty cart or short stock; 404 for a vanished
/// product; 409 for taken dates or a lost stock race; 500 when the
/// transaction fails or times out.
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    CorrelationId(correlation_id): CorrelationId,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<Response, AppError> {
    tracing::debug!(%correlation_id, user_id = %caller.user_id, "Checkout requested");
    let order = state.checkout.checkout(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(Envelope::one("order", order))).into_response())
}
