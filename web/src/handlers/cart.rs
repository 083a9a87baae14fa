//! `/cart` endpoints. Every response carries the whole cart.

use super::Envelope;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, AuthUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rental_core::ProductId;
use rental_runtime::cart::AddItem;
use serde::Deserialize;

/// `PATCH /cart/items/:productId` body.
#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    /// New quantity, at least one.
    pub quantity: u32,
}

/// `GET /cart`
///
/// # Errors
///
/// 401 without identity.
pub async fn get(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Response, AppError> {
    let cart = state.carts.get(&caller).await?;
    Ok(Json(Envelope::one("cart", cart)).into_response())
}

/// `POST /cart/items` (201).
///
/// # Errors
///
/// 400 for bad quantity, dates or stock; 404 for an unknown product.
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(request): ApiJson<AddItem>,
) -> Result<Response, AppError> {
    let cart = state.carts.add_item(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(Envelope::one("cart", cart))).into_response())
}

/// `PATCH /cart/items/:productId`
///
/// # Errors
///
/// 400 for bad quantity or stock, 404 when the line is missing.
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(product): ApiPath<ProductId>,
    ApiJson(update): ApiJson<QuantityUpdate>,
) -> Result<Response, AppError> {
    let cart = state
        .carts
        .update_item(&caller, product, update.quantity)
        .await?;
    Ok(Json(Envelope::one("cart", cart)).into_response())
}

/// `DELETE /cart/items/:productId`
///
/// # Errors
///
/// 404 when the line is missing.
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(product): ApiPath<ProductId>,
) -> Result<Response, AppError> {
    let cart = state.carts.remove_item(&caller, product).await?;
    Ok(Json(Envelope::one("cart", cart)).into_response())
}

/// `DELETE /cart`
///
/// # Errors
///
/// 401 without identity.
pub async fn clear(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Response, AppError> {
    let cart = state.carts.clear(&caller).await?;
    Ok(Json(Envelope::one("cart", cart)).into_response())
}
