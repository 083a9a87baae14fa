//! Date-range reservations.
//!
//! [`BookingService`] enforces the rules that sit above storage: ownership,
//! the status state machine, which fields may change in which status, and
//! the friendly overlap messages. The no-overlap guarantee itself is the
//! store's: two concurrent creates can both pass
//! [`BookingStore::find_conflict`](rental_core::store::BookingStore::find_conflict),
//! and the store's atomic insert turns the loser into a [`StoreError::Conflict`].

use crate::RentalEnvironment;
use crate::metrics::counter;
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::address::BookingAddress;
use rental_core::booking::{
    Availability, Booking, BookingFilter, BookingPatch, BookingStatus, NewBooking, Owned, UserRef,
};
use rental_core::inventory::CalendarEntry;
use rental_core::{BookingId, Caller, DateRange, ProductId, RentalError, StoreError};

const DATES_TAKEN: &str = "Selected dates are not available for this product";
const DATES_OVERLAP: &str = "Updated dates overlap with another booking";

/// Which address of a booking an address update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// `shippingAddress`
    Shipping,
    /// `billingAddress`
    Billing,
}

/// Booking operations.
#[derive(Debug, Clone)]
pub struct BookingService {
    env: RentalEnvironment,
}

impl BookingService {
    /// Create the service.
    #[must_use]
    pub const fn new(env: RentalEnvironment) -> Self {
        Self { env }
    }

    /// Reserve `request.product` for the caller, in `pending` status.
    ///
    /// # Errors
    ///
    /// - `BadRequest` for an inverted range, a blank delivery time or an
    ///   incomplete address
    /// - `NotFound` if the product does not exist
    /// - `Conflict` if an active booking of the product overlaps the range,
    ///   including one committed concurrently
    pub async fn create(&self, caller: &Caller, request: NewBooking) -> Result<Booking, RentalError> {
        let period = DateRange::new(request.start_date, request.end_date)?;
        if request.delivery_time.trim().is_empty() {
            return Err(RentalError::BadRequest("deliveryTime is required".to_string()));
        }
        validate_addresses(
            request.shipping_address.as_ref(),
            request.billing_address.as_ref(),
        )?;

        self.env
            .products
            .get_product(request.product)
            .await?
            .ok_or_else(|| RentalError::NotFound("Product not found".to_string()))?;

        if let Some(existing) = self
            .env
            .bookings
            .find_conflict(request.product, period, None)
            .await?
        {
            tracing::debug!(
                product_id = %request.product,
                conflict_id = %existing.id,
                "Booking request overlaps an active booking"
            );
            return Err(overlap("create", DATES_TAKEN));
        }

        let now = self.env.clock.now();
        let booking = Booking {
            id: BookingId::new(),
            product: request.product,
            user: UserRef::Id(caller.user_id),
            price: request.price,
            period,
            delivery_time: request.delivery_time,
            special_requests: request.special_requests,
            shipping_address: request.shipping_address,
            billing_address: request.billing_address,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let booking = self
            .env
            .bookings
            .insert_booking(booking)
            .await
            .map_err(|err| store_failure("create", err))?;

        counter!("bookings_created_total").increment(1);
        tracing::info!(
            booking_id = %booking.id,
            product_id = %booking.product,
            user_id = %caller.user_id,
            start = %booking.period.start(),
            end = %booking.period.end(),
            "Booking created"
        );
        Ok(booking)
    }

    /// Apply `patch` to a booking.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the booking does not exist
    /// - `Forbidden` for a foreign booking, or a non-admin status change
    ///   other than cancellation
    /// - `BadRequest` when the patch changes product or user, inverts the
    ///   range or carries an incomplete address
    /// - `Conflict` when the booking is no longer editable, the status
    ///   transition is not allowed, or the new dates overlap another booking
    pub async fn update(
        &self,
        caller: &Caller,
        id: BookingId,
        patch: BookingPatch,
    ) -> Result<Booking, RentalError> {
        let mut booking = self.load(id).await?;
        caller.ensure_access(booking.owner_id())?;

        let changes_product = patch.product.is_some_and(|product| product != booking.product);
        let changes_user = patch
            .user
            .as_ref()
            .is_some_and(|user| user.id() != booking.owner_id());
        if changes_product || changes_user {
            return Err(RentalError::BadRequest(
                "Cannot change product or user on an existing booking".to_string(),
            ));
        }

        if patch.touches_core_fields() {
            ensure_editable(&booking)?;
        }
        if patch.price.is_some() && !caller.is_admin() {
            return Err(RentalError::Forbidden(
                "Only administrators can change the booking price".to_string(),
            ));
        }
        if let Some(next) = patch.status {
            check_transition(caller, booking.status, next)?;
        }
        validate_addresses(patch.shipping_address.as_ref(), patch.billing_address.as_ref())?;

        let status = patch.status.unwrap_or(booking.status);
        if patch.touches_dates() {
            let period = DateRange::new(
                patch.start_date.unwrap_or_else(|| booking.period.start()),
                patch.end_date.unwrap_or_else(|| booking.period.end()),
            )?;
            if status.is_active()
                && self
                    .env
                    .bookings
                    .find_conflict(booking.product, period, Some(booking.id))
                    .await?
                    .is_some()
            {
                return Err(overlap("update", DATES_OVERLAP));
            }
            booking.period = period;
        }

        if let Some(delivery_time) = patch.delivery_time {
            booking.delivery_time = delivery_time;
        }
        if let Some(special_requests) = patch.special_requests {
            booking.special_requests = Some(special_requests);
        }
        if let Some(address) = patch.shipping_address {
            booking.shipping_address = Some(address);
        }
        if let Some(address) = patch.billing_address {
            booking.billing_address = Some(address);
        }
        if let Some(price) = patch.price {
            booking.price = price;
        }
        booking.status = status;
        booking.updated_at = self.env.clock.now();

        let booking = self
            .env
            .bookings
            .update_booking(booking)
            .await
            .map_err(|err| store_failure("update", err))?;

        tracing::info!(
            booking_id = %booking.id,
            status = %booking.status,
            user_id = %caller.user_id,
            "Booking updated"
        );
        Ok(booking)
    }

    /// Hard-delete a booking, releasing its calendar holds.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `Forbidden` for a foreign booking.
    pub async fn delete(&self, caller: &Caller, id: BookingId) -> Result<(), RentalError> {
        let booking = self.load(id).await?;
        caller.ensure_access(booking.owner_id())?;

        if !self.env.bookings.delete_booking(id).await? {
            return Err(booking_not_found());
        }
        tracing::info!(booking_id = %id, user_id = %caller.user_id, "Booking deleted");
        Ok(())
    }

    /// Overwrite one address of an editable booking.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `Conflict` when the booking is no longer
    /// editable, `BadRequest` for an incomplete address.
    pub async fn update_address(
        &self,
        caller: &Caller,
        id: BookingId,
        kind: AddressKind,
        address: BookingAddress,
    ) -> Result<Booking, RentalError> {
        let mut booking = self.load(id).await?;
        caller.ensure_access(booking.owner_id())?;
        ensure_editable(&booking)?;
        address.validate()?;

        match kind {
            AddressKind::Shipping => booking.shipping_address = Some(address),
            AddressKind::Billing => booking.billing_address = Some(address),
        }
        booking.updated_at = self.env.clock.now();

        let booking = self.env.bookings.update_booking(booking).await?;
        tracing::info!(booking_id = %booking.id, address = ?kind, "Booking address updated");
        Ok(booking)
    }

    /// Overwrite the shipping address.
    ///
    /// # Errors
    ///
    /// See [`BookingService::update_address`].
    pub async fn update_shipping_address(
        &self,
        caller: &Caller,
        id: BookingId,
        address: BookingAddress,
    ) -> Result<Booking, RentalError> {
        self.update_address(caller, id, AddressKind::Shipping, address)
            .await
    }

    /// Overwrite the billing address.
    ///
    /// # Errors
    ///
    /// See [`BookingService::update_address`].
    pub async fn update_billing_address(
        &self,
        caller: &Caller,
        id: BookingId,
        address: BookingAddress,
    ) -> Result<Booking, RentalError> {
        self.update_address(caller, id, AddressKind::Billing, address)
            .await
    }

    /// Whether `product` is free between `start` and `end`. Public: no
    /// ownership check.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an inverted range.
    pub async fn check_availability(
        &self,
        product: ProductId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Availability, RentalError> {
        let period = DateRange::new(start, end)?;
        let conflict = self
            .env
            .bookings
            .find_conflict(product, period, None)
            .await?;
        Ok(Availability {
            available: conflict.is_none(),
            conflict_id: conflict.map(|booking| booking.id),
        })
    }

    /// One booking, if the caller may see it.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Forbidden`.
    pub async fn get(&self, caller: &Caller, id: BookingId) -> Result<Booking, RentalError> {
        let booking = self.load(id).await?;
        caller.ensure_access(booking.owner_id())?;
        Ok(booking)
    }

    /// Bookings visible to the caller, newest first.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn list(
        &self,
        caller: &Caller,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, RentalError> {
        let filter = BookingFilter {
            owner: caller.scope(),
            status,
            ..BookingFilter::default()
        };
        Ok(self.env.bookings.list_bookings(filter).await?)
    }

    /// Bookings visible to the caller that overlap `[start, end]`.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an inverted range.
    pub async fn in_range(
        &self,
        caller: &Caller,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, RentalError> {
        let filter = BookingFilter {
            owner: caller.scope(),
            overlapping: Some(DateRange::new(start, end)?),
            ..BookingFilter::default()
        };
        Ok(self.env.bookings.list_bookings(filter).await?)
    }

    /// Active bookings of one product visible to the caller, by start date.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn for_product(
        &self,
        caller: &Caller,
        product: ProductId,
    ) -> Result<Vec<Booking>, RentalError> {
        let filter = BookingFilter {
            owner: caller.scope(),
            product: Some(product),
            active_only: true,
            ..BookingFilter::default()
        };
        let mut bookings = self.env.bookings.list_bookings(filter).await?;
        bookings.sort_by_key(|booking| booking.period.start());
        Ok(bookings)
    }

    /// Calendar days of `product` between `from` and `to` inclusive that
    /// have ever been held. Days never touched are implicitly available.
    ///
    /// # Errors
    ///
    /// `BadRequest` when `to` is before `from`.
    pub async fn calendar(
        &self,
        product: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CalendarEntry>, RentalError> {
        if to < from {
            return Err(RentalError::BadRequest(
                "to must not be before from".to_string(),
            ));
        }
        Ok(self.env.bookings.calendar(product, from, to).await?)
    }

    async fn load(&self, id: BookingId) -> Result<Booking, RentalError> {
        self.env
            .bookings
            .get_booking(id)
            .await?
            .ok_or_else(booking_not_found)
    }
}

fn booking_not_found() -> RentalError {
    RentalError::NotFound("Booking not found".to_string())
}

fn ensure_editable(booking: &Booking) -> Result<(), RentalError> {
    if booking.status.is_editable() {
        Ok(())
    } else {
        Err(RentalError::Conflict(format!(
            "Booking cannot be modified in status '{}'",
            booking.status
        )))
    }
}

fn check_transition(
    caller: &Caller,
    current: BookingStatus,
    next: BookingStatus,
) -> Result<(), RentalError> {
    if current == next {
        return Ok(());
    }
    if !current.can_transition_to(next) {
        return Err(RentalError::Conflict(format!(
            "Cannot change booking status from '{current}' to '{next}'"
        )));
    }
    if next != BookingStatus::Cancelled && !caller.is_admin() {
        return Err(RentalError::Forbidden(format!(
            "Only administrators can mark a booking as '{next}'"
        )));
    }
    Ok(())
}

fn validate_addresses(
    shipping: Option<&BookingAddress>,
    billing: Option<&BookingAddress>,
) -> Result<(), RentalError> {
    if let Some(address) = shipping {
        address.validate()?;
    }
    if let Some(address) = billing {
        address.validate()?;
    }
    Ok(())
}

fn overlap(operation: &'static str, message: &str) -> RentalError {
    counter!("booking_conflicts_total", "operation" => operation).increment(1);
    RentalError::Conflict(message.to_string())
}

// The store's atomic overlap check fired after our pre-check passed: a
// concurrent writer won.
fn store_failure(operation: &'static str, err: StoreError) -> RentalError {
    match err {
        StoreError::Conflict(message) => {
            tracing::debug!(operation, %message, "Store rejected overlapping booking");
            overlap(operation, &message)
        }
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_needs_no_admin() {
        let user = Caller::user(rental_core::UserId::new());
        assert!(check_transition(&user, BookingStatus::Pending, BookingStatus::Cancelled).is_ok());
        assert!(check_transition(&user, BookingStatus::Confirmed, BookingStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_forward_transitions_need_admin() {
        let user = Caller::user(rental_core::UserId::new());
        let admin = Caller::admin(rental_core::UserId::new());

        let err = check_transition(&user, BookingStatus::Pending, BookingStatus::Confirmed).unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert!(check_transition(&admin, BookingStatus::Pending, BookingStatus::Confirmed).is_ok());
    }

    #[test]
    fn test_illegal_transition_is_conflict() {
        let admin = Caller::admin(rental_core::UserId::new());
        let err = check_transition(&admin, BookingStatus::Pending, BookingStatus::Delivered).unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert!(check_transition(&admin, BookingStatus::Shipped, BookingStatus::Shipped).is_ok());
    }
}
