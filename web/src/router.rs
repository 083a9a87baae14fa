//! Route table.

use crate::handlers::{bookings, cart, checkout, health, products};
use crate::middleware::request_context_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Build the full HTTP surface over `state`.
///
/// ```text
/// POST   /bookings                          201
/// GET    /bookings?status=
/// GET    /bookings/date-range?startDate&endDate
/// GET    /bookings/check-availability?productId&startDate&endDate
/// GET    /bookings/product/:id
/// GET    /bookings/:id
/// PATCH  /bookings/:id
/// DELETE /bookings/:id                      204
/// PATCH  /bookings/:id/shipping-address
/// PATCH  /bookings/:id/billing-address
/// POST   /checkout                          201
/// GET    /cart            DELETE /cart
/// POST   /cart/items                        201
/// PATCH  /cart/items/:id  DELETE /cart/items/:id
/// GET    /products/:id/calendar?from&to
/// GET    /health  /ready  /metrics
/// ```
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(bookings::create).get(bookings::list))
        .route("/bookings/date-range", get(bookings::in_range))
        .route(
            "/bookings/check-availability",
            get(bookings::check_availability),
        )
        .route("/bookings/product/:id", get(bookings::for_product))
        .route(
            "/bookings/:id",
            get(bookings::get)
                .patch(bookings::update)
                .delete(bookings::delete),
        )
        .route(
            "/bookings/:id/shipping-address",
            patch(bookings::update_shipping_address),
        )
        .route(
            "/bookings/:id/billing-address",
            patch(bookings::update_billing_address),
        )
        .route("/checkout", post(checkout::checkout))
        .route("/cart", get(cart::get).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/:id",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/products/:id/calendar", get(products::calendar))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/metrics", get(health::metrics))
        .layer(request_context_layer())
        .with_state(state)
}
