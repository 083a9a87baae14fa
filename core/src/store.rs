//! Storage abstractions.
//!
//! Services depend on these traits only. Two implementations exist:
//!
//! - `PostgresStore` (in `rental-postgres`): production, backed by sqlx
//! - `InMemoryStore` (in `rental-testing`): fast, deterministic tests
//!
//! # Concurrency contract
//!
//! Implementations, not callers, are responsible for the two invariants
//! that concurrent requests can break:
//!
//! - [`BookingStore::insert_booking`] and [`BookingStore::update_booking`]
//!   must reject a booking that overlaps another active booking of the same
//!   product *atomically with the write*, reporting [`StoreError::Conflict`].
//!   A prior [`BookingStore::find_conflict`] is only a fast path for a
//!   friendlier message; it is not what guarantees the invariant.
//! - [`CheckoutTransaction::decrement_stock`] must be a conditional write
//!   (`stock -= n WHERE stock >= n`), never a read followed by a blind write.
//!
//! # Dyn Compatibility
//!
//! Every method returns a boxed future instead of using `async fn`, so the
//! traits can be held as `Arc<dyn BookingStore>` and friends.

use crate::booking::{Booking, BookingFilter};
use crate::cart::Cart;
use crate::error::StoreError;
use crate::ids::{BookingId, OrderId, ProductId, UserId};
use crate::inventory::CalendarEntry;
use crate::order::{Order, OrderStatus};
use crate::product::Product;
use crate::range::DateRange;
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::pin::Pin;

/// Future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Read access to products, plus the upsert used for seeding.
pub trait ProductStore: Send + Sync {
    /// Load a product.
    fn get_product(&self, id: ProductId) -> StoreFuture<'_, Option<Product>>;

    /// Insert or replace a product.
    fn save_product(&self, product: Product) -> StoreFuture<'_, ()>;
}

/// Booking persistence with the no-overlap guarantee.
pub trait BookingStore: Send + Sync {
    /// Insert a new booking and hold its calendar days.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if an active booking of the same product
    /// overlaps `booking.period` at the moment of the write.
    fn insert_booking(&self, booking: Booking) -> StoreFuture<'_, Booking>;

    /// Replace an existing booking, moving its calendar holds to the new
    /// range (or releasing them if it is now cancelled).
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] on overlap with another active booking,
    /// [`StoreError::NotFound`] if the booking vanished.
    fn update_booking(&self, booking: Booking) -> StoreFuture<'_, Booking>;

    /// Hard-delete a booking and release its holds. Returns whether a row
    /// was deleted.
    fn delete_booking(&self, id: BookingId) -> StoreFuture<'_, bool>;

    /// Load one booking.
    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Bookings matching `filter`, newest first.
    fn list_bookings(&self, filter: BookingFilter) -> StoreFuture<'_, Vec<Booking>>;

    /// First active booking of `product` overlapping `range`, ignoring
    /// `exclude`.
    fn find_conflict(
        &self,
        product: ProductId,
        range: DateRange,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Option<Booking>>;

    /// Pending bookings created at or before `cutoff`.
    fn expired_pending(&self, cutoff: DateTime<Utc>) -> StoreFuture<'_, Vec<Booking>>;

    /// Release the holds of one expired booking and delete it, as a single
    /// unit of work. Only acts if the booking is still pending and was
    /// created at or before `cutoff`; returns whether it did.
    fn release_expired(&self, id: BookingId, cutoff: DateTime<Utc>) -> StoreFuture<'_, bool>;

    /// Calendar entries of `product` between `from` and `to` inclusive.
    fn calendar(
        &self,
        product: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreFuture<'_, Vec<CalendarEntry>>;
}

/// Cart persistence.
pub trait CartStore: Send + Sync {
    /// Load a user's cart.
    fn get_cart(&self, user: UserId) -> StoreFuture<'_, Option<Cart>>;

    /// Insert or replace a user's cart.
    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, ()>;
}

/// Order reads.
pub trait OrderStore: Send + Sync {
    /// Load one order.
    fn get_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>>;

    /// Orders in `status` whose estimated delivery falls in `[from, to)`.
    fn orders_due(
        &self,
        status: OrderStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Order>>;
}

/// Opens checkout units of work.
pub trait CheckoutStore: Send + Sync {
    /// Begin a transaction.
    fn begin(&self) -> StoreFuture<'_, Box<dyn CheckoutTransaction>>;
}

/// One checkout unit of work.
///
/// Nothing written through a transaction is visible to anyone else until
/// [`CheckoutTransaction::commit`] succeeds. Dropping the transaction
/// without committing, on any path including a timeout or a panic in the
/// caller, rolls everything back.
pub trait CheckoutTransaction: Send {
    /// Load a cart inside the transaction.
    fn load_cart(&mut self, user: UserId) -> StoreFuture<'_, Option<Cart>>;

    /// Load a product inside the transaction.
    fn load_product(&mut self, id: ProductId) -> StoreFuture<'_, Option<Product>>;

    /// Conditionally take `quantity` units. Returns `false`, writing
    /// nothing, when fewer units remain.
    fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> StoreFuture<'_, bool>;

    /// First active booking of `product` overlapping `range`.
    fn find_conflict(
        &mut self,
        product: ProductId,
        range: DateRange,
    ) -> StoreFuture<'_, Option<BookingId>>;

    /// Insert an order. Returns `false`, writing nothing, when the order
    /// number is already taken.
    fn insert_order(&mut self, order: Order) -> StoreFuture<'_, bool>;

    /// Replace the cart.
    fn save_cart(&mut self, cart: Cart) -> StoreFuture<'_, ()>;

    /// Make every write visible atomically.
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;

    /// Discard every write. Equivalent to dropping the transaction, but
    /// reports backend errors.
    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()>;
}
