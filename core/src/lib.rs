//! # Rental Core
//!
//! Domain types, error taxonomy and storage abstractions for the reservation
//! and checkout core of the rental platform.
//!
//! This crate is deliberately free of I/O. It defines:
//!
//! - **Entities**: [`booking::Booking`], [`cart::Cart`], [`order::Order`],
//!   [`product::Product`], [`inventory::CalendarEntry`]
//! - **Value objects**: [`range::DateRange`], [`money::Money`], typed ids
//! - **Errors**: [`error::RentalError`] (the HTTP-facing taxonomy) and
//!   [`error::StoreError`] (what storage backends report)
//! - **Seams**: dyn-compatible store traits in [`store`], the
//!   [`notify::Notifier`] trait and the [`environment::Clock`]
//!
//! Services live in `rental-runtime`; storage backends live in
//! `rental-testing` (in-memory) and `rental-postgres`.
//!
//! ## Example
//!
//! ```
//! use rental_core::range::DateRange;
//! use chrono::{TimeZone, Utc};
//!
//! let june = |d| Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap();
//! let held = DateRange::new(june(1), june(3)).unwrap();
//! let asked = DateRange::new(june(2), june(4)).unwrap();
//! assert!(held.overlaps(&asked));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod address;
pub mod booking;
pub mod caller;
pub mod cart;
pub mod error;
pub mod ids;
pub mod inventory;
pub mod money;
pub mod notify;
pub mod order;
pub mod product;
pub mod range;
pub mod settings;
pub mod store;

pub use caller::{Caller, Role};
pub use error::{RentalError, StoreError};
pub use ids::{BookingId, OrderId, ProductId, UserId};
pub use money::Money;
pub use range::DateRange;
pub use settings::RentalSettings;

/// Environment module - injected dependencies that are not storage.
///
/// All sources of non-determinism that services need are abstracted here
/// so tests can substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Every service asks the clock for "now" instead of calling
    /// `Utc::now()` directly, so expiry and date comparisons can be driven
    /// from tests without sleeping.
    ///
    /// # Examples
    ///
    /// ```
    /// use rental_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
