//! Product-scoped reads owned by this core.

use super::Envelope;
use crate::error::AppError;
use crate::extractors::{ApiPath, ApiQuery};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use rental_core::ProductId;
use serde::Deserialize;

/// `GET /products/:id/calendar` query; both bounds inclusive.
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// First day.
    pub from: NaiveDate,
    /// Last day.
    pub to: NaiveDate,
}

/// `GET /products/:id/calendar?from&to`
///
/// # Errors
///
/// 400 for missing or inverted bounds.
pub async fn calendar(
    State(state): State<AppState>,
    ApiPath(product): ApiPath<ProductId>,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> Result<Response, AppError> {
    let days = state
        .bookings
        .calendar(product, query.from, query.to)
        .await?;
    Ok(Json(Envelope::many("calendar", days)).into_response())
}
