//! # Rental Testing
//!
//! Testing utilities for the rental reservation and checkout core.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - [`InMemoryStore`], implementing every store trait with the same
//!   atomicity guarantees as the `PostgreSQL` backend, plus fault injection
//! - [`RecordingNotifier`], which captures notifications and can be told to fail
//! - Fixture builders for addresses, products and dates
//!
//! ## Example
//!
//! ```ignore
//! use rental_testing::{InMemoryStore, ManualClock, RecordingNotifier, test_clock};
//!
//! #[tokio::test]
//! async fn test_expiry() {
//!     let store = Arc::new(InMemoryStore::new());
//!     let clock = Arc::new(ManualClock::new(test_clock().now()));
//!     // build services over the store, advance the clock, assert
//! }
//! ```

use chrono::{DateTime, Utc};
use rental_core::environment::Clock;

pub mod fixtures;
pub mod memory;

pub use memory::InMemoryStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeDelta;
    use rental_core::notify::{NotifyError, NotifyFuture, Notifier};
    use rental_core::order::Order;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use rental_testing::mocks::FixedClock;
    /// use rental_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Lets expiry tests jump past a hold timeout without sleeping.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move forward by `delta`.
        pub fn advance(&self, delta: TimeDelta) {
            let mut time = self.time.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += delta;
        }

        /// Jump to `time`.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Notifier that records what it was asked to send.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        confirmations: Mutex<Vec<Order>>,
        reminders: Mutex<Vec<Order>>,
        failures_left: AtomicU32,
        attempts: AtomicU32,
    }

    impl RecordingNotifier {
        /// A notifier that always succeeds.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A notifier whose next `failures` sends fail.
        #[must_use]
        pub fn failing(failures: u32) -> Self {
            let notifier = Self::default();
            notifier.failures_left.store(failures, Ordering::SeqCst);
            notifier
        }

        /// Orders for which a confirmation was delivered.
        #[must_use]
        pub fn confirmations(&self) -> Vec<Order> {
            self.confirmations
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }

        /// Orders for which a reminder was delivered.
        #[must_use]
        pub fn reminders(&self) -> Vec<Order> {
            self.reminders
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }

        /// Total send attempts, failed or not.
        #[must_use]
        pub fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }

        fn record(&self, sink: &Mutex<Vec<Order>>, order: &Order) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(NotifyError::Delivery("mail relay unavailable".to_string()));
            }
            sink.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(order.clone());
            Ok(())
        }
    }

    impl Notifier for RecordingNotifier {
        fn order_confirmation<'a>(&'a self, order: &'a Order) -> NotifyFuture<'a> {
            Box::pin(async move { self.record(&self.confirmations, order) })
        }

        fn delivery_reminder<'a>(&'a self, order: &'a Order) -> NotifyFuture<'a> {
            Box::pin(async move { self.record(&self.reminders, order) })
        }
    }
}

/// Install a `tracing` subscriber for test output. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, RecordingNotifier, test_clock};
