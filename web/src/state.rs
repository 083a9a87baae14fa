//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use rental_runtime::RentalEnvironment;
use rental_runtime::booking::BookingService;
use rental_runtime::cart::CartService;
use rental_runtime::checkout::CheckoutService;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by [`ReadinessCheck::check`].
pub type ReadinessFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// A dependency `GET /ready` must reach before the service takes traffic.
pub trait ReadinessCheck: Send + Sync {
    /// `Err` with a short reason when the dependency is unreachable.
    fn check(&self) -> ReadinessFuture<'_>;
}

/// Readiness check for backends with nothing to probe.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysReady;

impl ReadinessCheck for AlwaysReady {
    fn check(&self) -> ReadinessFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Booking operations.
    pub bookings: BookingService,
    /// Cart operations.
    pub carts: CartService,
    /// Checkout.
    pub checkout: CheckoutService,
    /// Probe behind `GET /ready`.
    pub readiness: Arc<dyn ReadinessCheck>,
    /// Prometheus renderer behind `GET /metrics`, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build every service over one environment.
    #[must_use]
    pub fn new(env: &RentalEnvironment) -> Self {
        Self {
            bookings: BookingService::new(env.clone()),
            carts: CartService::new(env.clone()),
            checkout: CheckoutService::new(env.clone()),
            readiness: Arc::new(AlwaysReady),
            metrics: None,
        }
    }

    /// Replace the readiness probe.
    #[must_use]
    pub fn with_readiness(mut self, readiness: Arc<dyn ReadinessCheck>) -> Self {
        self.readiness = readiness;
        self
    }

    /// Expose `GET /metrics` through `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state.
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }
}
