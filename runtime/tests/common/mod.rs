//! Shared harness for the service integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use chrono::{DateTime, TimeZone, Utc};
use rental_core::cart::Cart;
use rental_core::environment::Clock;
use rental_core::product::Product;
use rental_core::store::{CartStore, ProductStore};
use rental_core::{Caller, Money, ProductId, RentalSettings, UserId};
use rental_runtime::RentalEnvironment;
use rental_runtime::retry::RetryPolicy;
use rental_testing::{InMemoryStore, ManualClock, RecordingNotifier};
use std::sync::Arc;
use std::time::Duration;

/// Noon on 20 May 2024, shortly before the June bookings the tests use.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub env: RentalEnvironment,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::new())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        rental_testing::init_test_tracing();
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let notifier = Arc::new(notifier);
        let env = RentalEnvironment::new(store.clone(), clock.clone(), notifier.clone())
            .with_notify_retry(
                RetryPolicy::new()
                    .with_max_retries(3)
                    .with_initial_delay(Duration::from_millis(1)),
            );
        Self {
            store,
            clock,
            notifier,
            env,
        }
    }

    pub fn with_settings(mut self, settings: RentalSettings) -> Self {
        self.env = self.env.with_settings(settings);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn product(&self, name: &str, pounds: u64, stock: u32) -> Product {
        let product = Product::new(name, Money::from_pounds(pounds), stock);
        self.store.save_product(product.clone()).await.unwrap();
        product
    }

    pub async fn set_stock(&self, id: ProductId, stock: u32) {
        let mut product = self.store.get_product(id).await.unwrap().unwrap();
        product.stock = stock;
        self.store.save_product(product).await.unwrap();
    }

    pub async fn stock_of(&self, id: ProductId) -> u32 {
        self.store.get_product(id).await.unwrap().unwrap().stock
    }

    pub async fn cart_of(&self, user: UserId) -> Option<Cart> {
        self.store.get_cart(user).await.unwrap()
    }

    /// Poll until `check` holds, giving spawned tasks a chance to run.
    pub async fn eventually(&self, mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        check()
    }
}

pub fn user() -> Caller {
    Caller::user(UserId::new())
}

pub fn admin() -> Caller {
    Caller::admin(UserId::new())
}
