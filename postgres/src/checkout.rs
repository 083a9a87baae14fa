//! Checkout as one database transaction.

use crate::rows;
use crate::{PostgresStore, db_error, to_pence};
use rental_core::cart::Cart;
use rental_core::order::Order;
use rental_core::product::Product;
use rental_core::store::{CheckoutStore, CheckoutTransaction, StoreFuture};
use rental_core::{BookingId, DateRange, ProductId, StoreError, UserId};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

/// A checkout in progress. Dropping it without [`CheckoutTransaction::commit`]
/// rolls back every write.
pub struct PgCheckoutTransaction {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgCheckoutTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCheckoutTransaction").finish_non_exhaustive()
    }
}

impl CheckoutStore for PostgresStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn CheckoutTransaction>> {
        Box::pin(async move {
            let tx = self.pool.begin().await.map_err(db_error)?;
            Ok(Box::new(PgCheckoutTransaction { tx }) as Box<dyn CheckoutTransaction>)
        })
    }
}

impl CheckoutTransaction for PgCheckoutTransaction {
    fn load_cart(&mut self, user: UserId) -> StoreFuture<'_, Option<Cart>> {
        // Locked so two checkouts of the same cart serialize.
        Box::pin(async move { rows::fetch_cart(&mut *self.tx, user, true).await })
    }

    fn load_product(&mut self, id: ProductId) -> StoreFuture<'_, Option<Product>> {
        Box::pin(async move { rows::fetch_product(&mut *self.tx, id).await })
    }

    fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let Ok(quantity) = i32::try_from(quantity) else {
                return Ok(false);
            };
            let result = sqlx::query(
                r"
                UPDATE products
                SET stock = stock - $2
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(*id.as_uuid())
            .bind(quantity)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn find_conflict(
        &mut self,
        product: ProductId,
        range: DateRange,
    ) -> StoreFuture<'_, Option<BookingId>> {
        Box::pin(async move {
            let conflict = rows::fetch_conflict(&mut *self.tx, product, range, None).await?;
            Ok(conflict.map(|booking| booking.id))
        })
    }

    fn insert_order(&mut self, order: Order) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                INSERT INTO orders (
                    id, order_number, user_id, items, total_amount_pence, payment_method,
                    bank_details, status, shipping_address, extras, estimated_delivery_date,
                    admin_notes, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (order_number) DO NOTHING
                ",
            )
            .bind(*order.id.as_uuid())
            .bind(&order.order_number)
            .bind(*order.user.as_uuid())
            .bind(Json(&order.items))
            .bind(to_pence(order.total_amount)?)
            .bind(order.payment_method.as_str())
            .bind(order.bank_details.as_ref().map(Json))
            .bind(order.status.as_str())
            .bind(Json(&order.shipping_address))
            .bind(Json(&order.extras))
            .bind(order.estimated_delivery_date)
            .bind(order.admin_notes.as_deref())
            .bind(order.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn save_cart(&mut self, cart: Cart) -> StoreFuture<'_, ()> {
        Box::pin(async move { rows::upsert_cart(&mut *self.tx, &cart).await })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        let this = *self;
        Box::pin(async move {
            this.tx
                .commit()
                .await
                .map_err(|e| StoreError::Database(format!("Commit failed: {e}")))
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        let this = *self;
        Box::pin(async move { this.tx.rollback().await.map_err(db_error) })
    }
}
