//! Expiry sweep: reclaims holds of abandoned pending bookings.
//!
//! Each expired booking is released in its own unit of work
//! ([`BookingStore::release_expired`](rental_core::store::BookingStore::release_expired)),
//! so one failure only skips that booking. The store re-checks "still
//! pending and still old enough" inside that unit, which makes the sweep
//! safe to run concurrently with confirmations and with itself.

use crate::RentalEnvironment;
use crate::metrics::counter;
use chrono::{DateTime, TimeDelta, Utc};
use rental_core::RentalError;

/// Releases pending bookings older than the hold timeout.
#[derive(Debug, Clone)]
pub struct ExpirySweep {
    env: RentalEnvironment,
}

impl ExpirySweep {
    /// Create the sweep.
    #[must_use]
    pub const fn new(env: RentalEnvironment) -> Self {
        Self { env }
    }

    /// Release every booking still `pending` whose `created_at` is at or
    /// before `now - timeout`, freeing its calendar days and deleting it.
    ///
    /// Returns how many were released. Running it again with nothing newly
    /// expired returns 0 and changes nothing.
    ///
    /// # Errors
    ///
    /// Only if the expired bookings cannot be listed at all; failures on
    /// individual bookings are logged and skipped.
    pub async fn release_expired(
        &self,
        now: DateTime<Utc>,
        timeout: TimeDelta,
    ) -> Result<usize, RentalError> {
        let cutoff = now
            .checked_sub_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let expired = self.env.bookings.expired_pending(cutoff).await?;
        if expired.is_empty() {
            return Ok(0);
        }

        let mut released = 0usize;
        for booking in expired {
            match self.env.bookings.release_expired(booking.id, cutoff).await {
                Ok(true) => {
                    released += 1;
                    tracing::info!(
                        booking_id = %booking.id,
                        product_id = %booking.product,
                        created_at = %booking.created_at,
                        "Released expired booking"
                    );
                }
                Ok(false) => {
                    tracing::debug!(booking_id = %booking.id, "Booking no longer eligible for release");
                }
                Err(err) => {
                    counter!("sweep_failures_total").increment(1);
                    tracing::warn!(
                        booking_id = %booking.id,
                        error = %err,
                        "Failed to release expired booking, continuing"
                    );
                }
            }
        }

        counter!("sweep_released_total").increment(u64::try_from(released).unwrap_or(u64::MAX));
        Ok(released)
    }

    /// One pass using the environment's clock and hold timeout.
    ///
    /// # Errors
    ///
    /// See [`ExpirySweep::release_expired`].
    pub async fn run_once(&self) -> Result<usize, RentalError> {
        self.release_expired(self.env.clock.now(), self.env.settings.hold_timeout)
            .await
    }
}
