//! Business tunables shared by the services.

use chrono::TimeDelta;
use std::time::Duration;

/// Tunables for the reservation and checkout services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalSettings {
    /// Upper bound on a checkout unit of work. Exceeding it aborts the
    /// transaction.
    pub checkout_timeout: Duration,
    /// Age after which a pending booking is considered abandoned.
    pub hold_timeout: TimeDelta,
    /// `estimated_delivery_date = now + delivery_offset`.
    pub delivery_offset: TimeDelta,
    /// Attempts at generating a unique order number before giving up.
    pub order_number_attempts: u32,
}

impl Default for RentalSettings {
    fn default() -> Self {
        Self {
            checkout_timeout: Duration::from_secs(5),
            hold_timeout: TimeDelta::minutes(30),
            delivery_offset: TimeDelta::days(7),
            order_number_attempts: 5,
        }
    }
}
