//! Prometheus metrics for the reservation and checkout services.
//!
//! Services record through the `metrics` facade; nothing is exported until
//! a recorder is installed with [`install_recorder`], which the server does
//! once at startup and then serves [`PrometheusHandle::render`] on
//! `GET /metrics`.
//!
//! # Metrics
//!
//! | Name | Kind | Labels |
//! |---|---|---|
//! | `bookings_created_total` | counter | |
//! | `booking_conflicts_total` | counter | `operation` |
//! | `checkouts_completed_total` | counter | |
//! | `checkouts_failed_total` | counter | `reason` |
//! | `checkout_duration_seconds` | histogram | |
//! | `sweep_released_total` | counter | |
//! | `sweep_failures_total` | counter | |
//! | `notifications_failed_total` | counter | `kind` |

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from installing the exporter.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The exporter could not be configured.
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// A different global recorder is already installed.
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

/// Install the Prometheus recorder and describe every metric.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or another
/// recorder already owns the global slot.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Describe every metric the services emit.
pub fn register_metrics() {
    describe_counter!("bookings_created_total", "Bookings accepted");
    describe_counter!(
        "booking_conflicts_total",
        "Booking writes refused because the dates overlap an active booking"
    );
    describe_counter!("checkouts_completed_total", "Orders committed by checkout");
    describe_counter!(
        "checkouts_failed_total",
        "Checkouts that failed, by reason (bad_request, not_found, conflict, timeout, internal)"
    );
    describe_histogram!(
        "checkout_duration_seconds",
        "Wall time of the checkout unit of work"
    );
    describe_counter!(
        "sweep_released_total",
        "Abandoned pending bookings released by the expiry sweep"
    );
    describe_counter!(
        "sweep_failures_total",
        "Per-booking failures skipped by the expiry sweep"
    );
    describe_counter!(
        "notifications_failed_total",
        "Notifications that failed after every retry, by kind"
    );
}

/// Label value for a failed checkout.
#[must_use]
pub const fn failure_reason(status_code: u16) -> &'static str {
    match status_code {
        400 => "bad_request",
        403 => "forbidden",
        404 => "not_found",
        409 => "conflict",
        _ => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_labels() {
        assert_eq!(failure_reason(400), "bad_request");
        assert_eq!(failure_reason(404), "not_found");
        assert_eq!(failure_reason(409), "conflict");
        assert_eq!(failure_reason(500), "internal");
    }

    #[test]
    fn test_register_without_recorder_is_harmless() {
        register_metrics();
        counter!("bookings_created_total").increment(1);
    }
}
