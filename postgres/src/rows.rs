//! Row mappers and the queries shared by the pooled store and checkout
//! transactions.

use crate::{db_error, from_count, from_pence, to_count, to_pence};
use rental_core::address::{BankDetails, BookingAddress, ShippingDetails};
use rental_core::booking::{Booking, BookingStatus, UserRef};
use rental_core::cart::{Cart, CartItem};
use rental_core::inventory::{CalendarEntry, CalendarStatus};
use rental_core::order::{Order, OrderExtras, OrderItem};
use rental_core::product::Product;
use rental_core::{BookingId, DateRange, OrderId, ProductId, StoreError, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

pub(crate) const BOOKING_COLUMNS: &str = "id, product_id, user_id, price_pence, start_date, \
     end_date, delivery_time, special_requests, shipping_address, billing_address, status, \
     created_at, updated_at";

pub(crate) const ORDER_COLUMNS: &str = "id, order_number, user_id, items, total_amount_pence, \
     payment_method, bank_details, status, shipping_address, extras, estimated_delivery_date, \
     admin_notes, created_at";

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(db_error)
}

fn parse<T>(value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Database(e.to_string()))
}

// ============================================================================
// Mappers
// ============================================================================

pub(crate) fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        price: from_pence(get(row, "price_pence")?)?,
        stock: from_count(get(row, "stock")?)?,
    })
}

pub(crate) fn booking_from_row(row: &PgRow) -> Result<Booking, StoreError> {
    let start: DateTime<Utc> = get(row, "start_date")?;
    let end: DateTime<Utc> = get(row, "end_date")?;
    let status: String = get(row, "status")?;
    let shipping: Option<Json<BookingAddress>> = get(row, "shipping_address")?;
    let billing: Option<Json<BookingAddress>> = get(row, "billing_address")?;

    Ok(Booking {
        id: BookingId::from_uuid(get(row, "id")?),
        product: ProductId::from_uuid(get(row, "product_id")?),
        user: UserRef::Id(UserId::from_uuid(get(row, "user_id")?)),
        price: from_pence(get(row, "price_pence")?)?,
        period: DateRange::new(start, end).map_err(|e| StoreError::Database(e.to_string()))?,
        delivery_time: get(row, "delivery_time")?,
        special_requests: get(row, "special_requests")?,
        shipping_address: shipping.map(|Json(address)| address),
        billing_address: billing.map(|Json(address)| address),
        status: parse::<BookingStatus>(&status)?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub(crate) fn calendar_from_row(row: &PgRow) -> Result<CalendarEntry, StoreError> {
    let status: String = get(row, "status")?;
    let bookings: Vec<Uuid> = get(row, "booking_ids")?;
    Ok(CalendarEntry {
        product: ProductId::from_uuid(get(row, "product_id")?),
        day: get::<NaiveDate>(row, "day")?,
        status: parse::<CalendarStatus>(&status)?,
        bookings: bookings.into_iter().map(BookingId::from_uuid).collect(),
    })
}

fn cart_from_row(row: &PgRow) -> Result<Cart, StoreError> {
    let Json(items): Json<Vec<CartItem>> = get(row, "items")?;
    Ok(Cart {
        user: UserId::from_uuid(get(row, "user_id")?),
        items,
        total_items: from_count(get(row, "total_items")?)?,
        total_price: from_pence(get(row, "total_price_pence")?)?,
        updated_at: get(row, "updated_at")?,
    })
}

pub(crate) fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let Json(items): Json<Vec<OrderItem>> = get(row, "items")?;
    let Json(shipping_address): Json<ShippingDetails> = get(row, "shipping_address")?;
    let Json(extras): Json<OrderExtras> = get(row, "extras")?;
    let bank_details: Option<Json<BankDetails>> = get(row, "bank_details")?;
    let payment_method: String = get(row, "payment_method")?;
    let status: String = get(row, "status")?;

    Ok(Order {
        id: OrderId::from_uuid(get(row, "id")?),
        order_number: get(row, "order_number")?,
        user: UserId::from_uuid(get(row, "user_id")?),
        items,
        total_amount: from_pence(get(row, "total_amount_pence")?)?,
        payment_method: parse(&payment_method)?,
        bank_details: bank_details.map(|Json(details)| details),
        status: parse(&status)?,
        shipping_address,
        extras,
        estimated_delivery_date: get(row, "estimated_delivery_date")?,
        admin_notes: get(row, "admin_notes")?,
        created_at: get(row, "created_at")?,
    })
}

// ============================================================================
// Shared queries
// ============================================================================

pub(crate) async fn fetch_product<'e, E: PgExecutor<'e>>(
    executor: E,
    id: ProductId,
) -> Result<Option<Product>, StoreError> {
    let row = sqlx::query("SELECT id, name, price_pence, stock FROM products WHERE id = $1")
        .bind(*id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(db_error)?;
    row.as_ref().map(product_from_row).transpose()
}

/// Load a cart, row-locking it when `lock` is set.
pub(crate) async fn fetch_cart<'e, E: PgExecutor<'e>>(
    executor: E,
    user: UserId,
    lock: bool,
) -> Result<Option<Cart>, StoreError> {
    let sql = if lock {
        "SELECT user_id, items, total_items, total_price_pence, updated_at \
         FROM carts WHERE user_id = $1 FOR UPDATE"
    } else {
        "SELECT user_id, items, total_items, total_price_pence, updated_at \
         FROM carts WHERE user_id = $1"
    };
    let row = sqlx::query(sql)
        .bind(*user.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(db_error)?;
    row.as_ref().map(cart_from_row).transpose()
}

pub(crate) async fn upsert_cart<'e, E: PgExecutor<'e>>(
    executor: E,
    cart: &Cart,
) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO carts (user_id, items, total_items, total_price_pence, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE
        SET items = EXCLUDED.items,
            total_items = EXCLUDED.total_items,
            total_price_pence = EXCLUDED.total_price_pence,
            updated_at = EXCLUDED.updated_at
        ",
    )
    .bind(*cart.user.as_uuid())
    .bind(Json(&cart.items))
    .bind(to_count(cart.total_items)?)
    .bind(to_pence(cart.total_price)?)
    .bind(cart.updated_at)
    .execute(executor)
    .await
    .map_err(db_error)?;
    Ok(())
}

/// First active booking of `product` intersecting `range`, earliest start
/// first.
pub(crate) async fn fetch_conflict<'e, E: PgExecutor<'e>>(
    executor: E,
    product: ProductId,
    range: DateRange,
    exclude: Option<BookingId>,
) -> Result<Option<Booking>, StoreError> {
    let row = sqlx::query(&format!(
        r"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE product_id = $1
          AND status <> 'cancelled'
          AND start_date <= $3
          AND end_date >= $2
          AND ($4::uuid IS NULL OR id <> $4)
        ORDER BY start_date
        LIMIT 1
        "
    ))
    .bind(*product.as_uuid())
    .bind(range.start())
    .bind(range.end())
    .bind(exclude.map(|id| *id.as_uuid()))
    .fetch_optional(executor)
    .await
    .map_err(db_error)?;
    row.as_ref().map(booking_from_row).transpose()
}
