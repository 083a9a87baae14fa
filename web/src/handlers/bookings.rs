//! `/bookings` endpoints.

use super::Envelope;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rental_core::address::BookingAddress;
use rental_core::booking::{BookingPatch, BookingStatus, NewBooking};
use rental_core::{BookingId, ProductId};
use serde::Deserialize;

/// `GET /bookings` query.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Restrict to one status.
    pub status: Option<BookingStatus>,
}

/// `GET /bookings/date-range` query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    /// Range start.
    pub start_date: DateTime<Utc>,
    /// Range end.
    pub end_date: DateTime<Utc>,
}

/// `GET /bookings/check-availability` query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    /// Product to check.
    pub product_id: ProductId,
    /// Range start.
    pub start_date: DateTime<Utc>,
    /// Range end.
    pub end_date: DateTime<Utc>,
}

/// `POST /bookings` (201).
///
/// # Errors
///
/// 400 on validation, 404 for an unknown product, 409 when the dates are taken.
pub async fn create(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(request): ApiJson<NewBooking>,
) -> Result<Response, AppError> {
    let booking = state.bookings.create(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(Envelope::one("booking", booking))).into_response())
}

/// `GET /bookings`: all bookings for admins, the caller's own otherwise.
///
/// # Errors
///
/// 401 without identity.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Response, AppError> {
    let bookings = state.bookings.list(&caller, query.status).await?;
    Ok(Json(Envelope::many("bookings", bookings)).into_response())
}

/// `GET /bookings/date-range?startDate&endDate`
///
/// # Errors
///
/// 400 for a missing or inverted range.
pub async fn in_range(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<Response, AppError> {
    let bookings = state
        .bookings
        .in_range(&caller, query.start_date, query.end_date)
        .await?;
    Ok(Json(Envelope::many("bookings", bookings)).into_response())
}

/// `GET /bookings/product/:id`
///
/// # Errors
///
/// 401 without identity.
pub async fn for_product(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(product): ApiPath<ProductId>,
) -> Result<Response, AppError> {
    let bookings = state.bookings.for_product(&caller, product).await?;
    Ok(Json(Envelope::many("bookings", bookings)).into_response())
}

/// `GET /bookings/check-availability?productId&startDate&endDate`. Public.
///
/// # Errors
///
/// 400 for a missing or inverted range.
pub async fn check_availability(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Response, AppError> {
    let availability = state
        .bookings
        .check_availability(query.product_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(Envelope::new(availability)).into_response())
}

/// `GET /bookings/:id`
///
/// # Errors
///
/// 403 for someone else's booking, 404 if absent.
pub async fn get(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<BookingId>,
) -> Result<Response, AppError> {
    let booking = state.bookings.get(&caller, id).await?;
    Ok(Json(Envelope::one("booking", booking)).into_response())
}

/// `PATCH /bookings/:id`
///
/// # Errors
///
/// 400, 403, 404 or 409 as decided by the booking rules.
pub async fn update(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<BookingId>,
    ApiJson(patch): ApiJson<BookingPatch>,
) -> Result<Response, AppError> {
    let booking = state.bookings.update(&caller, id, patch).await?;
    Ok(Json(Envelope::one("booking", booking)).into_response())
}

/// `DELETE /bookings/:id` (204).
///
/// # Errors
///
/// 403 for someone else's booking, 404 if absent.
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<BookingId>,
) -> Result<StatusCode, AppError> {
    state.bookings.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /bookings/:id/shipping-address`
///
/// # Errors
///
/// 400 for an incomplete address, 403, 404, 409 when not editable.
pub async fn update_shipping_address(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<BookingId>,
    ApiJson(address): ApiJson<BookingAddress>,
) -> Result<Response, AppError> {
    let booking = state
        .bookings
        .update_shipping_address(&caller, id, address)
        .await?;
    Ok(Json(Envelope::one("booking", booking)).into_response())
}

/// `PATCH /bookings/:id/billing-address`
///
/// # Errors
///
/// 400 for an incomplete address, 403, 404, 409 when not editable.
pub async fn update_billing_address(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<BookingId>,
    ApiJson(address): ApiJson<BookingAddress>,
) -> Result<Response, AppError> {
    let booking = state
        .bookings
        .update_billing_address(&caller, id, address)
        .await?;
    Ok(Json(Envelope::one("booking", booking)).into_response())
}
