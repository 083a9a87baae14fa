//! # Rental Runtime
//!
//! Services for the reservation and checkout core.
//!
//! Every service is a thin struct over a shared [`RentalEnvironment`]: the
//! store traits from `rental-core`, a [`Clock`] and a [`Notifier`]. The
//! services own the business rules (validation, ownership, status gating,
//! error mapping); the stores own atomicity.
//!
//! - [`booking::BookingService`]: date-range reservations with the
//!   no-overlap guarantee
//! - [`checkout::CheckoutService`]: cart to order as one unit of work
//! - [`cart::CartService`]: the staging list checkout consumes
//! - [`sweep::ExpirySweep`]: releases abandoned pending bookings
//! - [`reminders::DeliveryReminders`]: reminder notifications for upcoming deliveries
//! - [`scheduler::Scheduler`]: runs the periodic jobs until shut down
//!
//! ## Example
//!
//! ```ignore
//! use rental_runtime::{RentalEnvironment, booking::BookingService};
//!
//! let env = RentalEnvironment::new(store, Arc::new(SystemClock), Arc::new(TracingNotifier));
//! let bookings = BookingService::new(env.clone());
//! let booking = bookings.create(&caller, request).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use rental_core::RentalSettings;
use rental_core::environment::Clock;
use rental_core::notify::Notifier;
use rental_core::store::{BookingStore, CartStore, CheckoutStore, OrderStore, ProductStore};
use std::sync::Arc;

pub mod booking;
pub mod cart;
pub mod checkout;
pub mod metrics;
pub mod notify;
pub mod reminders;
pub mod retry;
pub mod scheduler;
pub mod sweep;

use retry::RetryPolicy;

/// Dependencies shared by every service.
///
/// Cheap to clone; every field is reference counted or `Copy`.
#[derive(Clone)]
pub struct RentalEnvironment {
    /// Source of "now".
    pub clock: Arc<dyn Clock>,
    /// Product reads.
    pub products: Arc<dyn ProductStore>,
    /// Booking persistence.
    pub bookings: Arc<dyn BookingStore>,
    /// Cart persistence.
    pub carts: Arc<dyn CartStore>,
    /// Order reads.
    pub orders: Arc<dyn OrderStore>,
    /// Checkout units of work.
    pub checkout: Arc<dyn CheckoutStore>,
    /// Outbound notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Business tunables.
    pub settings: RentalSettings,
    /// Back-off for post-commit notifications.
    pub notify_retry: RetryPolicy,
}

impl RentalEnvironment {
    /// Build an environment where a single backend serves every store trait.
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self
    where
        S: ProductStore + BookingStore + CartStore + OrderStore + CheckoutStore + 'static,
    {
        Self {
            clock,
            products: store.clone(),
            bookings: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            checkout: store,
            notifier,
            settings: RentalSettings::default(),
            notify_retry: RetryPolicy::default(),
        }
    }

    /// Replace the business tunables.
    #[must_use]
    pub fn with_settings(mut self, settings: RentalSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the notification back-off.
    #[must_use]
    pub fn with_notify_retry(mut self, policy: RetryPolicy) -> Self {
        self.notify_retry = policy;
        self
    }
}

impl std::fmt::Debug for RentalEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RentalEnvironment")
            .field("settings", &self.settings)
            .field("notify_retry", &self.notify_retry)
            .finish_non_exhaustive()
    }
}
