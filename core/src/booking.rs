//! Bookings: date-range reservations of a product.
//!
//! # Lifecycle
//!
//! ```text
//! pending ──► confirmed ──► shipped ──► delivered
//!    │            │
//!    └────────────┴──► cancelled
//! ```
//!
//! A booking is editable only while `pending` or `confirmed`. Cancelled
//! bookings no longer take part in overlap checks, so their range becomes
//! free again.

use crate::address::BookingAddress;
use crate::error::RentalError;
use crate::ids::{BookingId, ProductId, UserId};
use crate::money::Money;
use crate::range::DateRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Status
// ============================================================================

/// Booking status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created, awaiting confirmation. Expires after the hold timeout.
    #[default]
    Pending,
    /// Confirmed by the business.
    Confirmed,
    /// Handed to delivery.
    Shipped,
    /// Delivered to the customer.
    Delivered,
    /// Cancelled; excluded from overlap checks.
    Cancelled,
}

impl BookingStatus {
    /// String form used on the wire and in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether core fields (dates, delivery, addresses, status) may change.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether this booking holds its date range.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Whether `self -> next` is an edge of the lifecycle.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(RentalError::BadRequest(format!(
                "Invalid booking status '{other}'"
            ))),
        }
    }
}

// ============================================================================
// Owner reference
// ============================================================================

/// Reference to the owning user.
///
/// Clients may send either a bare id or a populated user object; both
/// normalize through [`UserRef::id`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    /// Bare id.
    Id(UserId),
    /// Populated user summary.
    Populated(UserSummary),
}

/// Populated user fields carried alongside a reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserRef {
    /// The referenced user's id, whichever shape the reference has.
    #[must_use]
    pub const fn id(&self) -> UserId {
        match self {
            Self::Id(id) => *id,
            Self::Populated(summary) => summary.id,
        }
    }
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        Self::Id(id)
    }
}

/// Entities owned by a single user.
pub trait Owned {
    /// Owning user.
    fn owner_id(&self) -> UserId;
}

// ============================================================================
// Booking
// ============================================================================

/// A date-range reservation of one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking id.
    pub id: BookingId,
    /// Reserved product.
    pub product: ProductId,
    /// Requesting user.
    pub user: UserRef,
    /// Agreed price.
    pub price: Money,
    /// Reserved range.
    #[serde(flatten)]
    pub period: DateRange,
    /// Requested delivery slot.
    pub delivery_time: String,
    /// Free-text requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    /// Delivery address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<BookingAddress>,
    /// Billing address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<BookingAddress>,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Creation time; drives hold expiry.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Owned for Booking {
    fn owner_id(&self) -> UserId {
        self.user.id()
    }
}

impl Booking {
    /// Whether this booking blocks `range` on its product.
    #[must_use]
    pub fn blocks(&self, range: &DateRange) -> bool {
        self.status.is_active() && self.period.overlaps(range)
    }
}

/// Input for creating a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    /// Product to reserve.
    pub product: ProductId,
    /// Agreed price.
    pub price: Money,
    /// First instant of the reservation.
    pub start_date: DateTime<Utc>,
    /// Last instant of the reservation.
    pub end_date: DateTime<Utc>,
    /// Requested delivery slot.
    pub delivery_time: String,
    /// Free-text requests.
    #[serde(default)]
    pub special_requests: Option<String>,
    /// Delivery address.
    #[serde(default)]
    pub shipping_address: Option<BookingAddress>,
    /// Billing address.
    #[serde(default)]
    pub billing_address: Option<BookingAddress>,
}

/// Partial update of a booking. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    /// Must match the current product if present.
    pub product: Option<ProductId>,
    /// Must match the current owner if present.
    pub user: Option<UserRef>,
    /// New price.
    pub price: Option<Money>,
    /// New start.
    pub start_date: Option<DateTime<Utc>>,
    /// New end.
    pub end_date: Option<DateTime<Utc>>,
    /// New delivery slot.
    pub delivery_time: Option<String>,
    /// New free-text requests.
    pub special_requests: Option<String>,
    /// New delivery address.
    pub shipping_address: Option<BookingAddress>,
    /// New billing address.
    pub billing_address: Option<BookingAddress>,
    /// Requested status transition.
    pub status: Option<BookingStatus>,
}

impl BookingPatch {
    /// Whether the patch touches fields that are frozen once a booking
    /// leaves the editable statuses.
    #[must_use]
    pub const fn touches_core_fields(&self) -> bool {
        self.start_date.is_some()
            || self.end_date.is_some()
            || self.delivery_time.is_some()
            || self.shipping_address.is_some()
            || self.billing_address.is_some()
            || self.status.is_some()
    }

    /// Whether the patch changes the reserved range.
    #[must_use]
    pub const fn touches_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Filter for booking list queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BookingFilter {
    /// Restrict to bookings owned by this user.
    pub owner: Option<UserId>,
    /// Restrict to one status.
    pub status: Option<BookingStatus>,
    /// Restrict to one product.
    pub product: Option<ProductId>,
    /// Restrict to bookings overlapping this range.
    pub overlapping: Option<DateRange>,
    /// Exclude cancelled bookings.
    pub active_only: bool,
}

impl BookingFilter {
    /// Whether `booking` passes every set criterion.
    #[must_use]
    pub fn matches(&self, booking: &Booking) -> bool {
        self.owner.is_none_or(|owner| booking.owner_id() == owner)
            && self.status.is_none_or(|status| booking.status == status)
            && self.product.is_none_or(|product| booking.product == product)
            && self
                .overlapping
                .is_none_or(|range| booking.period.overlaps(&range))
            && (!self.active_only || booking.status.is_active())
    }
}

/// Result of an availability query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Whether the range is free.
    pub available: bool,
    /// The first conflicting booking, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_id: Option<BookingId>,
}
