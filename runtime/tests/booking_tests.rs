//! Integration tests for the booking service over the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{Harness, admin, user};
use futures::future::join_all;
use rental_core::RentalError;
use rental_core::booking::{BookingPatch, BookingStatus, Owned};
use rental_core::inventory::CalendarStatus;
use rental_core::store::BookingStore;
use rental_runtime::booking::BookingService;
use rental_testing::fixtures::{booking_request, june, sample_booking_address};

// ============================================================================
// Creation and overlap
// ============================================================================

#[tokio::test]
async fn test_overlapping_range_is_rejected_adjacent_range_accepted() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Bell tent", 50, 2).await;
    let caller = user();

    service
        .create(&caller, booking_request(product.id, 1, 3))
        .await
        .unwrap();

    let overlapping = service
        .create(&caller, booking_request(product.id, 2, 4))
        .await
        .unwrap_err();
    assert_eq!(overlapping.status_code(), 409);
    assert_eq!(
        overlapping.message(),
        "Selected dates are not available for this product"
    );

    let later = service
        .create(&caller, booking_request(product.id, 4, 6))
        .await
        .unwrap();
    assert_eq!(later.status, BookingStatus::Pending);
}

#[tokio::test]
async fn test_new_booking_is_pending_owned_and_holds_calendar_days() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let caller = user();

    let booking = service
        .create(&caller, booking_request(product.id, 10, 12))
        .await
        .unwrap();

    assert_eq!(booking.owner_id(), caller.user_id);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.created_at, h.now());

    let days = h
        .store
        .calendar(product.id, june(9).date_naive(), june(13).date_naive())
        .await
        .unwrap();
    assert_eq!(days.len(), 3);
    assert!(days.iter().all(|d| d.status == CalendarStatus::Booked));
    assert!(days.iter().all(|d| d.bookings == vec![booking.id]));
}

#[tokio::test]
async fn test_create_validates_before_touching_the_store() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let caller = user();

    let inverted = service
        .create(&caller, booking_request(product.id, 5, 5))
        .await
        .unwrap_err();
    assert_eq!(inverted.status_code(), 400);

    let mut request = booking_request(product.id, 5, 6);
    request.delivery_time = "  ".to_string();
    let no_delivery = service.create(&caller, request).await.unwrap_err();
    assert_eq!(no_delivery.status_code(), 400);

    let mut request = booking_request(product.id, 5, 6);
    let mut address = sample_booking_address();
    address.city = String::new();
    address.postal_code = String::new();
    request.shipping_address = Some(address);
    let bad_address = service.create(&caller, request).await.unwrap_err();
    assert_eq!(
        bad_address.message(),
        "Missing required address fields: city, postalCode"
    );

    let unknown = service
        .create(&caller, booking_request(rental_core::ProductId::new(), 5, 6))
        .await
        .unwrap_err();
    assert_eq!(unknown, RentalError::NotFound("Product not found".to_string()));

    assert!(h.store.bookings().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_creates_admit_exactly_one() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Marquee", 300, 5).await;

    let attempts = (0..16).map(|i| {
        let service = service.clone();
        let start = 1 + (i % 3);
        tokio::spawn(async move {
            service
                .create(&user(), booking_request(product.id, start, start + 3))
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.status_code() == 409)
    );
    assert_eq!(h.store.bookings().await.len(), 1);
}

// ============================================================================
// Updates
// ============================================================================

#[tokio::test]
async fn test_update_is_gated_by_ownership() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let owner = user();
    let booking = service
        .create(&owner, booking_request(product.id, 1, 2))
        .await
        .unwrap();

    let patch = BookingPatch {
        special_requests: Some("Ring the bell".to_string()),
        ..BookingPatch::default()
    };
    let foreign = service
        .update(&user(), booking.id, patch.clone())
        .await
        .unwrap_err();
    assert_eq!(foreign.status_code(), 403);

    let by_admin = service.update(&admin(), booking.id, patch).await.unwrap();
    assert_eq!(by_admin.special_requests.as_deref(), Some("Ring the bell"));
}

#[tokio::test]
async fn test_update_rejects_product_or_user_change() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let other = h.product("Bouncy castle", 120, 1).await;
    let owner = user();
    let booking = service
        .create(&owner, booking_request(product.id, 1, 2))
        .await
        .unwrap();

    let err = service
        .update(
            &owner,
            booking.id,
            BookingPatch {
                product: Some(other.id),
                ..BookingPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    let same_product = service
        .update(
            &owner,
            booking.id,
            BookingPatch {
                product: Some(product.id),
                ..BookingPatch::default()
            },
        )
        .await;
    assert!(same_product.is_ok());
}

#[tokio::test]
async fn test_moving_dates_ignores_own_range_but_not_others() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let owner = user();
    let first = service
        .create(&owner, booking_request(product.id, 1, 3))
        .await
        .unwrap();
    service
        .create(&user(), booking_request(product.id, 10, 12))
        .await
        .unwrap();

    let shifted = service
        .update(
            &owner,
            first.id,
            BookingPatch {
                end_date: Some(june(5)),
                ..BookingPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(shifted.period.end(), june(5));

    let clash = service
        .update(
            &owner,
            first.id,
            BookingPatch {
                start_date: Some(june(9)),
                end_date: Some(june(11)),
                ..BookingPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        clash,
        RentalError::Conflict("Updated dates overlap with another booking".to_string())
    );

    let days = h
        .store
        .calendar(product.id, june(1).date_naive(), june(5).date_naive())
        .await
        .unwrap();
    assert_eq!(days.len(), 5);
    assert!(days.iter().all(|d| d.bookings == vec![first.id]));
}

#[tokio::test]
async fn test_status_machine_and_editability() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let owner = user();
    let staff = admin();
    let booking = service
        .create(&owner, booking_request(product.id, 1, 2))
        .await
        .unwrap();

    let self_confirm = service
        .update(
            &owner,
            booking.id,
            BookingPatch {
                status: Some(BookingStatus::Confirmed),
                ..BookingPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(self_confirm.status_code(), 403);

    for next in [BookingStatus::Confirmed, BookingStatus::Shipped] {
        service
            .update(
                &staff,
                booking.id,
                BookingPatch {
                    status: Some(next),
                    ..BookingPatch::default()
                },
            )
            .await
            .unwrap();
    }

    let frozen = service
        .update(
            &staff,
            booking.id,
            BookingPatch {
                delivery_time: Some("12pm-4pm".to_string()),
                ..BookingPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(frozen.status_code(), 409);

    let notes_only = service
        .update(
            &owner,
            booking.id,
            BookingPatch {
                special_requests: Some("Leave by the gate".to_string()),
                ..BookingPatch::default()
            },
        )
        .await;
    assert!(notes_only.is_ok());

    let address = service
        .update_shipping_address(&owner, booking.id, sample_booking_address())
        .await
        .unwrap_err();
    assert_eq!(address.status_code(), 409);
}

#[tokio::test]
async fn test_owner_cancellation_frees_the_dates() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let owner = user();
    let booking = service
        .create(&owner, booking_request(product.id, 1, 3))
        .await
        .unwrap();

    let cancelled = service
        .update(
            &owner,
            booking.id,
            BookingPatch {
                status: Some(BookingStatus::Cancelled),
                ..BookingPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let availability = service
        .check_availability(product.id, june(2), june(4))
        .await
        .unwrap();
    assert!(availability.available);
    service
        .create(&user(), booking_request(product.id, 2, 4))
        .await
        .unwrap();
}

// ============================================================================
// Delete, addresses, queries
// ============================================================================

#[tokio::test]
async fn test_delete_releases_holds() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let owner = user();
    let booking = service
        .create(&owner, booking_request(product.id, 1, 2))
        .await
        .unwrap();

    assert_eq!(
        service.delete(&user(), booking.id).await.unwrap_err().status_code(),
        403
    );
    service.delete(&owner, booking.id).await.unwrap();

    assert_eq!(
        service.get(&owner, booking.id).await.unwrap_err(),
        RentalError::NotFound("Booking not found".to_string())
    );
    let days = h
        .store
        .calendar(product.id, june(1).date_naive(), june(2).date_naive())
        .await
        .unwrap();
    assert!(days.iter().all(|d| d.status == CalendarStatus::Available));
}

#[tokio::test]
async fn test_address_updates_overwrite_one_field() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let owner = user();
    let booking = service
        .create(&owner, booking_request(product.id, 1, 2))
        .await
        .unwrap();

    let mut billing = sample_booking_address();
    billing.line1 = "10 Invoice Street".to_string();
    let updated = service
        .update_billing_address(&owner, booking.id, billing.clone())
        .await
        .unwrap();
    assert_eq!(updated.billing_address, Some(billing));
    assert_eq!(updated.shipping_address, None);

    let updated = service
        .update_shipping_address(&owner, booking.id, sample_booking_address())
        .await
        .unwrap();
    assert_eq!(updated.shipping_address, Some(sample_booking_address()));

    let mut incomplete = sample_booking_address();
    incomplete.full_name = String::new();
    let err = service
        .update_shipping_address(&owner, booking.id, incomplete)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Missing required address fields: fullName");
}

#[tokio::test]
async fn test_availability_reports_conflict_id() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let product = h.product("Gazebo", 80, 1).await;
    let booking = service
        .create(&user(), booking_request(product.id, 7, 9))
        .await
        .unwrap();

    let taken = service
        .check_availability(product.id, june(9), june(10))
        .await
        .unwrap();
    assert!(!taken.available);
    assert_eq!(taken.conflict_id, Some(booking.id));

    let free = service
        .check_availability(product.id, june(10), june(11))
        .await
        .unwrap();
    assert!(free.available);
    assert_eq!(free.conflict_id, None);
}

#[tokio::test]
async fn test_queries_are_scoped_to_the_caller() {
    let h = Harness::new();
    let service = BookingService::new(h.env.clone());
    let tent = h.product("Bell tent", 50, 1).await;
    let castle = h.product("Bouncy castle", 120, 1).await;
    let alice = user();
    let bob = user();
    let staff = admin();

    service.create(&alice, booking_request(tent.id, 10, 11)).await.unwrap();
    service.create(&alice, booking_request(tent.id, 1, 2)).await.unwrap();
    let bobs = service.create(&bob, booking_request(castle.id, 1, 2)).await.unwrap();
    service
        .update(
            &staff,
            bobs.id,
            BookingPatch {
                status: Some(BookingStatus::Confirmed),
                ..BookingPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(service.list(&alice, None).await.unwrap().len(), 2);
    assert_eq!(service.list(&staff, None).await.unwrap().len(), 3);
    let confirmed = service
        .list(&staff, Some(BookingStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, bobs.id);

    let early = service.in_range(&staff, june(1), june(3)).await.unwrap();
    assert_eq!(early.len(), 2);
    let alice_early = service.in_range(&alice, june(1), june(3)).await.unwrap();
    assert_eq!(alice_early.len(), 1);

    let tent_bookings = service.for_product(&alice, tent.id).await.unwrap();
    assert_eq!(tent_bookings.len(), 2);
    assert!(tent_bookings[0].period.start() < tent_bookings[1].period.start());
    assert!(service.for_product(&bob, tent.id).await.unwrap().is_empty());

    assert_eq!(
        service.get(&bob, tent_bookings[0].id).await.unwrap_err().status_code(),
        403
    );
}

// ============================================================================
// Property: no two active bookings of a product overlap
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;
    use rental_core::DateRange;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_active_bookings_never_overlap(
            requests in prop::collection::vec((1u32..25, 1u32..5, any::<bool>()), 1..20)
        ) {
            tokio_test::block_on(async {
                let h = Harness::new();
                let service = BookingService::new(h.env.clone());
                let product = h.product("Tent", 50, 1).await;
                let owner = user();

                for (start, length, cancel) in requests {
                    if let Ok(booking) = service
                        .create(&owner, booking_request(product.id, start, start + length))
                        .await
                    {
                        if cancel {
                            let patch = BookingPatch {
                                status: Some(BookingStatus::Cancelled),
                                ..BookingPatch::default()
                            };
                            service.update(&owner, booking.id, patch).await.unwrap();
                        }
                    }
                }

                let active: Vec<DateRange> = h
                    .store
                    .bookings()
                    .await
                    .into_iter()
                    .filter(|b| b.status.is_active())
                    .map(|b| b.period)
                    .collect();
                for (i, a) in active.iter().enumerate() {
                    for b in &active[i + 1..] {
                        assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
                    }
                }
            });
        }
    }
}
