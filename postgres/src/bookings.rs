//! Bookings and the inventory calendar.
//!
//! Every booking write and the calendar holds it implies happen in one
//! transaction. Overlap is enforced by the `bookings_no_overlap` exclusion
//! constraint; its violation (SQLSTATE `23P01`) surfaces as
//! [`StoreError::Conflict`].

use crate::rows::{self, BOOKING_COLUMNS};
use crate::{PostgresStore, db_error, to_pence, write_error};
use rental_core::booking::{Booking, BookingFilter, BookingStatus};
use rental_core::inventory::CalendarEntry;
use rental_core::store::{BookingStore, StoreFuture};
use rental_core::{BookingId, DateRange, ProductId, StoreError};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, Row};

const CREATE_CONFLICT: &str = "Selected dates are not available for this product";
const UPDATE_CONFLICT: &str = "Updated dates overlap with another booking";

/// Record `booking`'s hold on every day of its range. Maintenance days keep
/// their status.
async fn hold_days(conn: &mut PgConnection, booking: &Booking) -> Result<(), StoreError> {
    if !booking.status.is_active() {
        return Ok(());
    }
    sqlx::query(
        r"
        INSERT INTO inventory_calendar (product_id, day, status, booking_ids)
        SELECT $1, d::date, 'booked', ARRAY[$2]::uuid[]
        FROM generate_series($3::date, $4::date, interval '1 day') AS d
        ON CONFLICT (product_id, day) DO UPDATE
        SET booking_ids = CASE
                WHEN $2 = ANY(inventory_calendar.booking_ids) THEN inventory_calendar.booking_ids
                ELSE array_append(inventory_calendar.booking_ids, $2)
            END,
            status = CASE
                WHEN inventory_calendar.status = 'maintenance' THEN 'maintenance'
                ELSE 'booked'
            END
        ",
    )
    .bind(*booking.product.as_uuid())
    .bind(*booking.id.as_uuid())
    .bind(booking.period.start().date_naive())
    .bind(booking.period.end().date_naive())
    .execute(conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

/// Drop every hold of `booking`. A booked day with no holds left becomes
/// available again.
async fn release_days(
    conn: &mut PgConnection,
    product: ProductId,
    booking: BookingId,
) -> Result<(), StoreError> {
    sqlx::query(
        r"
        UPDATE inventory_calendar
        SET booking_ids = array_remove(booking_ids, $2),
            status = CASE
                WHEN status = 'booked' AND cardinality(array_remove(booking_ids, $2)) = 0
                    THEN 'available'
                ELSE status
            END
        WHERE product_id = $1 AND $2 = ANY(booking_ids)
        ",
    )
    .bind(*product.as_uuid())
    .bind(*booking.as_uuid())
    .execute(conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

impl BookingStore for PostgresStore {
    fn insert_booking(&self, booking: Booking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            sqlx::query(
                r"
                INSERT INTO bookings (
                    id, product_id, user_id, price_pence, start_date, end_date,
                    delivery_time, special_requests, shipping_address, billing_address,
                    status, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ",
            )
            .bind(*booking.id.as_uuid())
            .bind(*booking.product.as_uuid())
            .bind(*booking.user.id().as_uuid())
            .bind(to_pence(booking.price)?)
            .bind(booking.period.start())
            .bind(booking.period.end())
            .bind(&booking.delivery_time)
            .bind(booking.special_requests.as_deref())
            .bind(booking.shipping_address.as_ref().map(Json))
            .bind(booking.billing_address.as_ref().map(Json))
            .bind(booking.status.as_str())
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, CREATE_CONFLICT))?;

            hold_days(&mut tx, &booking).await?;
            tx.commit().await.map_err(db_error)?;

            tracing::debug!(booking_id = %booking.id, product_id = %booking.product, "Booking row inserted");
            Ok(booking)
        })
    }

    fn update_booking(&self, booking: Booking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            let previous = sqlx::query("SELECT product_id FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(*booking.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?
                .ok_or_else(|| StoreError::NotFound("Booking".to_string()))?;
            let previous_product = ProductId::from_uuid(previous.try_get("product_id").map_err(db_error)?);

            release_days(&mut tx, previous_product, booking.id).await?;

            sqlx::query(
                r"
                UPDATE bookings
                SET price_pence = $2,
                    start_date = $3,
                    end_date = $4,
                    delivery_time = $5,
                    special_requests = $6,
                    shipping_address = $7,
                    billing_address = $8,
                    status = $9,
                    updated_at = $10
                WHERE id = $1
                ",
            )
            .bind(*booking.id.as_uuid())
            .bind(to_pence(booking.price)?)
            .bind(booking.period.start())
            .bind(booking.period.end())
            .bind(&booking.delivery_time)
            .bind(booking.special_requests.as_deref())
            .bind(booking.shipping_address.as_ref().map(Json))
            .bind(booking.billing_address.as_ref().map(Json))
            .bind(booking.status.as_str())
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, UPDATE_CONFLICT))?;

            hold_days(&mut tx, &booking).await?;
            tx.commit().await.map_err(db_error)?;
            Ok(booking)
        })
    }

    fn delete_booking(&self, id: BookingId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            let deleted = sqlx::query("DELETE FROM bookings WHERE id = $1 RETURNING product_id")
                .bind(*id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
            let Some(row) = deleted else {
                return Ok(false);
            };

            let product = ProductId::from_uuid(row.try_get("product_id").map_err(db_error)?);
            release_days(&mut tx, product, id).await?;
            tx.commit().await.map_err(db_error)?;
            Ok(true)
        })
    }

    fn get_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
            row.as_ref().map(rows::booking_from_row).transpose()
        })
    }

    fn list_bookings(&self, filter: BookingFilter) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {BOOKING_COLUMNS}
                FROM bookings
                WHERE ($1::uuid IS NULL OR user_id = $1)
                  AND ($2::text IS NULL OR status = $2)
                  AND ($3::uuid IS NULL OR product_id = $3)
                  AND ($4::timestamptz IS NULL OR start_date <= $5::timestamptz)
                  AND ($5::timestamptz IS NULL OR end_date >= $4::timestamptz)
                  AND (NOT $6 OR status <> 'cancelled')
                ORDER BY created_at DESC
                "
            ))
            .bind(filter.owner.map(|id| *id.as_uuid()))
            .bind(filter.status.map(|status| status.as_str()))
            .bind(filter.product.map(|id| *id.as_uuid()))
            .bind(filter.overlapping.map(|range| range.start()))
            .bind(filter.overlapping.map(|range| range.end()))
            .bind(filter.active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
            rows.iter().map(rows::booking_from_row).collect()
        })
    }

    fn find_conflict(
        &self,
        product: ProductId,
        range: DateRange,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move { rows::fetch_conflict(&self.pool, product, range, exclude).await })
    }

    fn expired_pending(&self, cutoff: DateTime<Utc>) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {BOOKING_COLUMNS}
                FROM bookings
                WHERE status = $1 AND created_at <= $2
                ORDER BY created_at
                "
            ))
            .bind(BookingStatus::Pending.as_str())
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
            rows.iter().map(rows::booking_from_row).collect()
        })
    }

    fn release_expired(&self, id: BookingId, cutoff: DateTime<Utc>) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            // Re-checked under the row lock so a booking confirmed after the
            // sweep listed it survives.
            let deleted = sqlx::query(
                r"
                DELETE FROM bookings
                WHERE id = $1 AND status = $2 AND created_at <= $3
                RETURNING product_id
                ",
            )
            .bind(*id.as_uuid())
            .bind(BookingStatus::Pending.as_str())
            .bind(cutoff)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
            let Some(row) = deleted else {
                return Ok(false);
            };

            let product = ProductId::from_uuid(row.try_get("product_id").map_err(db_error)?);
            release_days(&mut tx, product, id).await?;
            tx.commit().await.map_err(db_error)?;
            Ok(true)
        })
    }

    fn calendar(
        &self,
        product: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreFuture<'_, Vec<CalendarEntry>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT product_id, day, status, booking_ids
                FROM inventory_calendar
                WHERE product_id = $1 AND day BETWEEN $2 AND $3
                ORDER BY day
                ",
            )
            .bind(*product.as_uuid())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
            rows.iter().map(rows::calendar_from_row).collect()
        })
    }
}
