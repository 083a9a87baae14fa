//! Fixture builders shared by the test suites of every crate.

use chrono::{DateTime, TimeZone, Utc};
use rental_core::address::{BookingAddress, ShippingDetails};
use rental_core::booking::NewBooking;
use rental_core::ids::{OrderId, ProductId, UserId};
use rental_core::money::Money;
use rental_core::order::{Order, OrderExtras, OrderItem, OrderStatus, PaymentMethod};

/// Midnight UTC on the given date.
///
/// # Panics
///
/// Panics on an impossible date; fixtures are expected to pass valid ones.
#[must_use]
#[allow(clippy::expect_used)]
pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("fixture date should be valid")
}

/// Midnight UTC on the given day of June 2024.
#[must_use]
pub fn june(d: u32) -> DateTime<Utc> {
    day(2024, 6, d)
}

/// A complete booking address.
#[must_use]
pub fn sample_booking_address() -> BookingAddress {
    BookingAddress {
        full_name: "Ada Lovelace".to_string(),
        line1: "1 Analytical Way".to_string(),
        line2: None,
        city: "London".to_string(),
        state: Some("Greater London".to_string()),
        postal_code: "N1 1AA".to_string(),
        country: "UK".to_string(),
        phone: Some("07700900000".to_string()),
    }
}

/// Complete checkout shipping details without a separate billing address.
#[must_use]
pub fn sample_shipping() -> ShippingDetails {
    ShippingDetails {
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
        phone: Some("07700900000".to_string()),
        street: Some("1 Analytical Way".to_string()),
        city: Some("London".to_string()),
        state: Some("Greater London".to_string()),
        country: Some("UK".to_string()),
        zip_code: Some("N1 1AA".to_string()),
        ..ShippingDetails::default()
    }
}

/// A booking request for `product` between two days of June 2024.
#[must_use]
pub fn booking_request(product: ProductId, start: u32, end: u32) -> NewBooking {
    NewBooking {
        product,
        price: Money::from_pounds(50),
        start_date: june(start),
        end_date: june(end),
        delivery_time: "8am-12pm".to_string(),
        special_requests: None,
        shipping_address: None,
        billing_address: None,
    }
}

/// A committed-looking order with one line.
#[must_use]
pub fn sample_order() -> Order {
    let now = day(2025, 1, 1);
    Order {
        id: OrderId::new(),
        order_number: "ORD2501011234".to_string(),
        user: UserId::new(),
        items: vec![OrderItem {
            product: ProductId::new(),
            name: "Bell tent".to_string(),
            quantity: 1,
            price: Money::from_pounds(50),
            period: None,
        }],
        total_amount: Money::from_pounds(50),
        payment_method: PaymentMethod::CashOnDelivery,
        bank_details: None,
        status: OrderStatus::Pending,
        shipping_address: sample_shipping(),
        extras: OrderExtras::default(),
        estimated_delivery_date: day(2025, 1, 3),
        admin_notes: None,
        created_at: now,
    }
}
