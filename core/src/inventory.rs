//! Per-day inventory calendar.
//!
//! Each `(product, day)` pair has at most one entry. Creating a booking
//! records a hold on every day of its range; cancelling, deleting or
//! expiring the booking releases it.

use crate::error::RentalError;
use crate::ids::{BookingId, ProductId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a product on a given day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarStatus {
    /// Free to book.
    #[default]
    Available,
    /// Held by at least one booking.
    Booked,
    /// Taken out of service.
    Maintenance,
}

impl CalendarStatus {
    /// String form used on the wire and in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Maintenance => "maintenance",
        }
    }
}

impl FromStr for CalendarStatus {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "booked" => Ok(Self::Booked),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(RentalError::Internal(format!(
                "Unknown calendar status '{other}'"
            ))),
        }
    }
}

/// One product on one day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    /// Product.
    pub product: ProductId,
    /// Day (UTC).
    pub day: NaiveDate,
    /// Status.
    pub status: CalendarStatus,
    /// Bookings holding this day.
    pub bookings: Vec<BookingId>,
}

impl CalendarEntry {
    /// A fresh, available entry.
    #[must_use]
    pub const fn available(product: ProductId, day: NaiveDate) -> Self {
        Self {
            product,
            day,
            status: CalendarStatus::Available,
            bookings: Vec::new(),
        }
    }

    /// Record a hold for `booking`.
    pub fn hold(&mut self, booking: BookingId) {
        if !self.bookings.contains(&booking) {
            self.bookings.push(booking);
        }
        if self.status == CalendarStatus::Available {
            self.status = CalendarStatus::Booked;
        }
    }

    /// Drop the hold for `booking`. Returns whether a hold was removed.
    pub fn release(&mut self, booking: BookingId) -> bool {
        let before = self.bookings.len();
        self.bookings.retain(|held| *held != booking);
        let removed = self.bookings.len() != before;
        if self.bookings.is_empty() && self.status == CalendarStatus::Booked {
            self.status = CalendarStatus::Available;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_and_release() {
        let day = NaiveDate::default();
        let booking = BookingId::new();
        let mut entry = CalendarEntry::available(ProductId::new(), day);

        entry.hold(booking);
        entry.hold(booking);
        assert_eq!(entry.status, CalendarStatus::Booked);
        assert_eq!(entry.bookings, vec![booking]);

        assert!(entry.release(booking));
        assert_eq!(entry.status, CalendarStatus::Available);
        assert!(!entry.release(booking));
    }

    #[test]
    fn test_maintenance_survives_release() {
        let booking = BookingId::new();
        let mut entry = CalendarEntry::available(ProductId::new(), NaiveDate::default());
        entry.status = CalendarStatus::Maintenance;
        entry.hold(booking);
        entry.release(booking);
        assert_eq!(entry.status, CalendarStatus::Maintenance);
    }
}
