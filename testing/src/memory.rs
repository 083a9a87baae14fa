//! In-memory implementation of every store trait.
//!
//! All state sits behind one `tokio::sync::Mutex`. Single-call operations
//! (booking insert with its overlap check, expiry release) run under one
//! lock acquisition, which gives them the same atomicity the `PostgreSQL`
//! backend gets from constraints and transactions.
//!
//! A checkout transaction holds the lock for its whole lifetime and works
//! on a private copy of the state. `commit` swaps the copy in; dropping the
//! transaction discards it.

use chrono::{DateTime, NaiveDate, Utc};
use rental_core::booking::{Booking, BookingFilter, BookingStatus};
use rental_core::cart::Cart;
use rental_core::error::StoreError;
use rental_core::ids::{BookingId, OrderId, ProductId, UserId};
use rental_core::inventory::CalendarEntry;
use rental_core::order::{Order, OrderStatus};
use rental_core::product::Product;
use rental_core::range::DateRange;
use rental_core::store::{
    BookingStore, CartStore, CheckoutStore, CheckoutTransaction, OrderStore, ProductStore,
    StoreFuture,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    bookings: HashMap<BookingId, Booking>,
    calendar: BTreeMap<(ProductId, NaiveDate), CalendarEntry>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
}

impl State {
    fn conflict(
        &self,
        product: ProductId,
        range: &DateRange,
        exclude: Option<BookingId>,
    ) -> Option<&Booking> {
        self.bookings
            .values()
            .filter(|b| b.product == product && Some(b.id) != exclude && b.blocks(range))
            .min_by_key(|b| b.period.start())
    }

    fn hold(&mut self, booking: &Booking) {
        if !booking.status.is_active() {
            return;
        }
        for day in booking.period.days() {
            self.calendar
                .entry((booking.product, day))
                .or_insert_with(|| CalendarEntry::available(booking.product, day))
                .hold(booking.id);
        }
    }

    fn release(&mut self, booking: &Booking) {
        for day in booking.period.days() {
            if let Some(entry) = self.calendar.get_mut(&(booking.product, day)) {
                entry.release(booking.id);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_order_insert: AtomicBool,
    fail_commit: AtomicBool,
    failing_releases: StdMutex<HashSet<BookingId>>,
    transaction_delay: StdMutex<Option<Duration>>,
}

impl Faults {
    fn take(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }

    fn release_fails(&self, id: BookingId) -> bool {
        self.failing_releases
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&id)
    }

    fn delay(&self) -> Option<Duration> {
        *self
            .transaction_delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// In-memory store for tests.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Make the next order insert inside a checkout fail with a database
    /// error, after stock has already been decremented in the transaction.
    pub fn fail_next_order_insert(&self) {
        self.faults.fail_order_insert.store(true, Ordering::SeqCst);
    }

    /// Make the next checkout commit fail.
    pub fn fail_next_commit(&self) {
        self.faults.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Make every `release_expired` call for `id` fail.
    pub fn fail_release_of(&self, id: BookingId) {
        self.faults
            .failing_releases
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id);
    }

    /// Stall every checkout transaction for `delay` after it loads the cart.
    pub fn delay_transactions(&self, delay: Duration) {
        *self
            .faults
            .transaction_delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(delay);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Every stored order.
    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }

    /// Every stored booking.
    pub async fn bookings(&self) -> Vec<Booking> {
        self.state.lock().await.bookings.values().cloned().collect()
    }

    /// Store an order directly, bypassing checkout.
    pub async fn put_order(&self, order: Order) {
        self.state.lock().await.orders.insert(order.id, order);
    }
}

impl ProductStore for InMemoryStore {
    fn get_product(&self, id: ProductId) -> StoreFuture<'_, Option<Product>> {
        Box::pin(async move { Ok(self.state.lock().await.products.get(&id).cloned()) })
    }

    fn save_product(&self, product: Product) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.state.lock().await.products.insert(product.id, product);
            Ok(())
        })
    }
}

impl BookingStore for InMemoryStore {
    fn insert_booking(&self, booking: Booking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if booking.status.is_active()
                && state.conflict(booking.product, &booking.period, None).is_some()
            {
                return Err(StoreError::Conflict(
                    "Selected dates are not available for this product".to_string(),
                ));
            }
            state.hold(&booking);
            state.bookings.insert(booking.id, booking.clone());
            Ok(booking)
        })
    }

    fn update_booking(&self, booking: Booking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let Some(previous) = state.bookings.get(&booking.id).cloned() else {
                return Err(StoreError::NotFound("Booking".to_string()));
            };
            if booking.status.is_active()
                && state
                    .conflict(booking.product, &booking.period, Some(booking.id))
                    .is_some()
            {
                return Err(StoreError::Conflict(
                    "Updated dates overlap with another booking".to_string(),
                ));
            }
            state.release(&previous);
            state.hold(&booking);
            state.bookings.insert(booking.id, booking.clone());
            Ok(booking)
        })
    }

    fn delete_booking(&self, id: BookingId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let Some(booking) = state.bookings.remove(&id) else {
                return Ok(false);
            };
            state.release(&booking);
            Ok(true)
        })
    }

    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move { Ok(self.state.lock().await.bookings.get(&id).cloned()) })
    }

    fn list_bookings(&self, filter: BookingFilter) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut bookings: Vec<Booking> = state
                .bookings
                .values()
                .filter(|b| filter.matches(b))
                .cloned()
                .collect();
            bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(bookings)
        })
    }

    fn find_conflict(
        &self,
        product: ProductId,
        range: DateRange,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.conflict(product, &range, exclude).cloned())
        })
    }

    fn expired_pending(&self, cutoff: DateTime<Utc>) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut expired: Vec<Booking> = state
                .bookings
                .values()
                .filter(|b| b.status == BookingStatus::Pending && b.created_at <= cutoff)
                .cloned()
                .collect();
            expired.sort_by_key(|b| b.created_at);
            Ok(expired)
        })
    }

    fn release_expired(&self, id: BookingId, cutoff: DateTime<Utc>) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            if self.faults.release_fails(id) {
                return Err(StoreError::Database(format!(
                    "injected failure releasing booking {id}"
                )));
            }
            let mut state = self.state.lock().await;
            let still_expired = state
                .bookings
                .get(&id)
                .is_some_and(|b| b.status == BookingStatus::Pending && b.created_at <= cutoff);
            if !still_expired {
                return Ok(false);
            }
            if let Some(booking) = state.bookings.remove(&id) {
                state.release(&booking);
            }
            Ok(true)
        })
    }

    fn calendar(
        &self,
        product: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreFuture<'_, Vec<CalendarEntry>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .calendar
                .range((product, from)..=(product, to))
                .map(|(_, entry)| entry.clone())
                .collect())
        })
    }
}

impl CartStore for InMemoryStore {
    fn get_cart(&self, user: UserId) -> StoreFuture<'_, Option<Cart>> {
        Box::pin(async move { Ok(self.state.lock().await.carts.get(&user).cloned()) })
    }

    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.state.lock().await.carts.insert(cart.user, cart);
            Ok(())
        })
    }
}

impl OrderStore for InMemoryStore {
    fn get_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move { Ok(self.state.lock().await.orders.get(&id).cloned()) })
    }

    fn orders_due(
        &self,
        status: OrderStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Order>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .orders
                .values()
                .filter(|o| {
                    o.status == status
                        && o.estimated_delivery_date >= from
                        && o.estimated_delivery_date < to
                })
                .cloned()
                .collect())
        })
    }
}

impl CheckoutStore for InMemoryStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn CheckoutTransaction>> {
        Box::pin(async move {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let working = guard.clone();
            let tx: Box<dyn CheckoutTransaction> = Box::new(InMemoryTransaction {
                guard,
                working,
                faults: Arc::clone(&self.faults),
            });
            Ok(tx)
        })
    }
}

/// Checkout unit of work over a private copy of the state.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: State,
    faults: Arc<Faults>,
}

impl CheckoutTransaction for InMemoryTransaction {
    fn load_cart(&mut self, user: UserId) -> StoreFuture<'_, Option<Cart>> {
        Box::pin(async move {
            if let Some(delay) = self.faults.delay() {
                tokio::time::sleep(delay).await;
            }
            Ok(self.working.carts.get(&user).cloned())
        })
    }

    fn load_product(&mut self, id: ProductId) -> StoreFuture<'_, Option<Product>> {
        Box::pin(async move { Ok(self.working.products.get(&id).cloned()) })
    }

    fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            match self.working.products.get_mut(&id) {
                Some(product) if product.stock >= quantity => {
                    product.stock -= quantity;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn find_conflict(
        &mut self,
        product: ProductId,
        range: DateRange,
    ) -> StoreFuture<'_, Option<BookingId>> {
        Box::pin(async move { Ok(self.working.conflict(product, &range, None).map(|b| b.id)) })
    }

    fn insert_order(&mut self, order: Order) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            if Faults::take(&self.faults.fail_order_insert) {
                return Err(StoreError::Database("injected order insert failure".to_string()));
            }
            let taken = self
                .working
                .orders
                .values()
                .any(|o| o.order_number == order.order_number);
            if taken {
                return Ok(false);
            }
            self.working.orders.insert(order.id, order);
            Ok(true)
        })
    }

    fn save_cart(&mut self, cart: Cart) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.working.carts.insert(cart.user, cart);
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            let Self {
                mut guard,
                working,
                faults,
            } = *self;
            if Faults::take(&faults.fail_commit) {
                return Err(StoreError::Database("injected commit failure".to_string()));
            }
            *guard = working;
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            drop(self);
            Ok(())
        })
    }
}
