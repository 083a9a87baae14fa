//! End-to-end tests of the HTTP surface over the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use chrono::{TimeZone, Utc};
use rental_core::product::Product;
use rental_core::store::ProductStore;
use rental_core::{Money, UserId};
use rental_runtime::RentalEnvironment;
use rental_runtime::cart::AddItem;
use rental_runtime::checkout::CheckoutRequest;
use rental_testing::fixtures::{booking_request, sample_shipping};
use rental_testing::{InMemoryStore, ManualClock, RecordingNotifier};
use rental_web::error::{ErrorBody, INTERNAL_MESSAGE};
use rental_web::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;

struct Api {
    server: TestServer,
    store: Arc<InMemoryStore>,
}

impl Api {
    fn new() -> Self {
        rental_testing::init_test_tracing();
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap(),
        ));
        let env = RentalEnvironment::new(
            store.clone(),
            clock,
            Arc::new(RecordingNotifier::new()),
        );
        let server = TestServer::new(build_router(AppState::new(&env))).unwrap();
        Self { server, store }
    }

    async fn product(&self, stock: u32) -> Product {
        let product = Product::new("Bell tent", Money::from_pounds(50), stock);
        self.store.save_product(product.clone()).await.unwrap();
        product
    }
}

fn as_user(request: TestRequest, user: UserId) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&user.to_string()).unwrap(),
    )
}

fn as_admin(request: TestRequest, user: UserId) -> TestRequest {
    as_user(request, user).add_header(
        HeaderName::from_static("x-user-role"),
        HeaderValue::from_static("admin"),
    )
}

// ============================================================================
// Bookings
// ============================================================================

#[tokio::test]
async fn test_create_booking_then_overlap_is_conflict() {
    let api = Api::new();
    let product = api.product(2).await;
    let alice = UserId::new();
    let bob = UserId::new();

    let created = as_user(api.server.post("/bookings"), alice)
        .json(&booking_request(product.id, 1, 3))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body: Value = created.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["booking"]["status"], "pending");

    let clash = as_user(api.server.post("/bookings"), bob)
        .json(&booking_request(product.id, 2, 4))
        .await;
    clash.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        clash.json::<ErrorBody>(),
        ErrorBody {
            status: "fail".to_string(),
            message: "Selected dates are not available for this product".to_string(),
        }
    );
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let api = Api::new();
    let response = api.server.get("/bookings").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<ErrorBody>().status, "fail");
}

#[tokio::test]
async fn test_booking_visibility_follows_ownership() {
    let api = Api::new();
    let product = api.product(1).await;
    let owner = UserId::new();

    let body: Value = as_user(api.server.post("/bookings"), owner)
        .json(&booking_request(product.id, 1, 2))
        .await
        .json();
    let id = body["data"]["booking"]["id"].as_str().unwrap().to_string();
    let path = format!("/bookings/{id}");

    as_user(api.server.get(&path), owner)
        .await
        .assert_status_ok();
    as_user(api.server.get(&path), UserId::new())
        .await
        .assert_status(StatusCode::FORBIDDEN);
    as_admin(api.server.get(&path), UserId::new())
        .await
        .assert_status_ok();

    let listed: Value = as_user(api.server.get("/bookings"), UserId::new())
        .await
        .json();
    assert_eq!(listed["results"], 0);
}

#[tokio::test]
async fn test_delete_returns_no_content() {
    let api = Api::new();
    let product = api.product(1).await;
    let owner = UserId::new();

    let body: Value = as_user(api.server.post("/bookings"), owner)
        .json(&booking_request(product.id, 1, 2))
        .await
        .json();
    let id = body["data"]["booking"]["id"].as_str().unwrap().to_string();

    as_user(api.server.delete(&format!("/bookings/{id}")), owner)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    as_user(api.server.get(&format!("/bookings/{id}")), owner)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_then_dates_are_available() {
    let api = Api::new();
    let product = api.product(1).await;
    let owner = UserId::new();

    let body: Value = as_user(api.server.post("/bookings"), owner)
        .json(&booking_request(product.id, 1, 3))
        .await
        .json();
    let id = body["data"]["booking"]["id"].as_str().unwrap().to_string();

    let availability = format!(
        "/bookings/check-availability?productId={}&startDate=2024-06-02T00:00:00Z&endDate=2024-06-04T00:00:00Z",
        product.id
    );
    let taken: Value = api.server.get(&availability).await.json();
    assert_eq!(taken["data"]["available"], false);
    assert_eq!(taken["data"]["conflictId"], id.as_str());

    as_user(api.server.patch(&format!("/bookings/{id}")), owner)
        .json(&json!({ "status": "cancelled" }))
        .await
        .assert_status_ok();

    let free: Value = api.server.get(&availability).await.json();
    assert_eq!(free["data"]["available"], true);
}

#[tokio::test]
async fn test_date_range_requires_both_bounds() {
    let api = Api::new();
    let response = as_user(
        api.server
            .get("/bookings/date-range?startDate=2024-06-01T00:00:00Z"),
        UserId::new(),
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incomplete_shipping_address_is_rejected() {
    let api = Api::new();
    let product = api.product(1).await;
    let owner = UserId::new();

    let body: Value = as_user(api.server.post("/bookings"), owner)
        .json(&booking_request(product.id, 1, 2))
        .await
        .json();
    let id = body["data"]["booking"]["id"].as_str().unwrap().to_string();

    let response = as_user(
        api.server.patch(&format!("/bookings/{id}/shipping-address")),
        owner,
    )
    .json(&json!({ "fullName": "Ada Lovelace", "line1": "1 Engine Street" }))
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(
        response
            .json::<ErrorBody>()
            .message
            .starts_with("Missing required address fields")
    );
}

#[tokio::test]
async fn test_calendar_shows_held_days() {
    let api = Api::new();
    let product = api.product(1).await;

    as_user(api.server.post("/bookings"), UserId::new())
        .json(&booking_request(product.id, 1, 3))
        .await
        .assert_status(StatusCode::CREATED);

    let body: Value = api
        .server
        .get(&format!(
            "/products/{}/calendar?from=2024-06-01&to=2024-06-30",
            product.id
        ))
        .await
        .json();
    assert_eq!(body["results"], 3);
    assert_eq!(body["data"]["calendar"][0]["status"], "booked");
}

// ============================================================================
// Cart and checkout
// ============================================================================

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        shipping_address: sample_shipping(),
        terms_accepted: true,
        ..CheckoutRequest::default()
    }
}

#[tokio::test]
async fn test_cart_to_order() {
    let api = Api::new();
    let product = api.product(5).await;
    let buyer = UserId::new();

    as_user(api.server.post("/cart/items"), buyer)
        .json(&AddItem {
            product: product.id,
            quantity: 2,
            start_date: None,
            end_date: None,
        })
        .await
        .assert_status(StatusCode::CREATED);

    let response = as_user(api.server.post("/checkout"), buyer)
        .json(&checkout_request())
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let order = &body["data"]["order"];
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD"));
    assert_eq!(order["status"], "pending");

    let cart: Value = as_user(api.server.get("/cart"), buyer).await.json();
    assert_eq!(cart["data"]["cart"]["totalItems"], 0);
    assert_eq!(
        api.store.get_product(product.id).await.unwrap().unwrap().stock,
        3
    );
}

#[tokio::test]
async fn test_checkout_of_empty_cart_fails() {
    let api = Api::new();
    let response = as_user(api.server.post("/checkout"), UserId::new())
        .json(&checkout_request())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ErrorBody>().message, "Cart is empty");
}

#[tokio::test]
async fn test_internal_errors_are_not_leaked() {
    let api = Api::new();
    let product = api.product(5).await;
    let buyer = UserId::new();
    as_user(api.server.post("/cart/items"), buyer)
        .json(&json!({ "product": product.id }))
        .await
        .assert_status(StatusCode::CREATED);
    api.store.fail_next_commit();

    let response = as_user(api.server.post("/checkout"), buyer)
        .json(&checkout_request())
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<ErrorBody>(),
        ErrorBody {
            status: "error".to_string(),
            message: INTERNAL_MESSAGE.to_string(),
        }
    );
}

#[tokio::test]
async fn test_cart_line_updates() {
    let api = Api::new();
    let product = api.product(5).await;
    let buyer = UserId::new();
    as_user(api.server.post("/cart/items"), buyer)
        .json(&json!({ "product": product.id }))
        .await
        .assert_status(StatusCode::CREATED);

    let path = format!("/cart/items/{}", product.id);
    let updated: Value = as_user(api.server.patch(&path), buyer)
        .json(&json!({ "quantity": 4 }))
        .await
        .json();
    assert_eq!(updated["data"]["cart"]["totalItems"], 4);

    as_user(api.server.patch(&path), buyer)
        .json(&json!({ "quantity": 9 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    as_user(api.server.delete(&path), buyer)
        .await
        .assert_status_ok();
    as_user(api.server.delete(&path), buyer)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_ready_and_metrics() {
    let api = Api::new();

    let health: Value = api.server.get("/health").await.json();
    assert_eq!(health["status"], "ok");

    api.server.get("/ready").await.assert_status_ok();
    api.server
        .get("/metrics")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
