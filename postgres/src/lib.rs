//! `PostgreSQL` storage backend for the rental core.
//!
//! [`PostgresStore`] implements every store trait from `rental-core` on a
//! single [`PgPool`]. The two concurrency invariants are enforced by the
//! database, not by application locks:
//!
//! - The `bookings_no_overlap` exclusion constraint rejects any active
//!   booking whose closed `[start, end]` range intersects another active
//!   booking of the same product, even when two inserts race.
//! - Checkout stock decrements are conditional updates
//!   (`stock = stock - n WHERE stock >= n`), and the whole checkout runs in
//!   one transaction ([`PgCheckoutTransaction`]).
//!
//! # Example
//!
//! ```ignore
//! use rental_postgres::PostgresStore;
//! use std::time::Duration;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/rental", 10, Duration::from_secs(5)).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bookings;
mod checkout;
mod rows;

pub use checkout::PgCheckoutTransaction;

use rental_core::cart::Cart;
use rental_core::order::{Order, OrderStatus};
use rental_core::product::Product;
use rental_core::store::{CartStore, OrderStore, ProductStore, StoreFuture};
use rental_core::{Money, OrderId, ProductId, StoreError, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// `PostgreSQL`-backed implementation of every rental store trait.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot be created or the
    /// first connection fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
    }

    /// Round-trip a trivial query. Used by readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Error and column conversions shared by every module
// ============================================================================

pub(crate) fn db_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// Map a write error, turning constraint violations into the domain's
/// conflict and not-found variants.
pub(crate) fn write_error(err: sqlx::Error, conflict_message: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            // exclusion_violation
            Some("23P01") => return StoreError::Conflict(conflict_message.to_string()),
            // foreign_key_violation
            Some("23503") => return StoreError::NotFound("Product".to_string()),
            _ => {}
        }
    }
    db_error(err)
}

pub(crate) fn to_pence(money: Money) -> Result<i64, StoreError> {
    i64::try_from(money.pence())
        .map_err(|_| StoreError::Database(format!("Amount {money} exceeds BIGINT")))
}

pub(crate) fn from_pence(pence: i64) -> Result<Money, StoreError> {
    u64::try_from(pence)
        .map(Money::from_pence)
        .map_err(|_| StoreError::Database(format!("Negative amount in database: {pence}")))
}

pub(crate) fn to_count(count: u32) -> Result<i32, StoreError> {
    i32::try_from(count).map_err(|_| StoreError::Database(format!("Count {count} exceeds INTEGER")))
}

pub(crate) fn from_count(count: i32) -> Result<u32, StoreError> {
    u32::try_from(count)
        .map_err(|_| StoreError::Database(format!("Negative count in database: {count}")))
}

// ============================================================================
// Products, carts, orders
// ============================================================================

impl ProductStore for PostgresStore {
    fn get_product(&self, id: ProductId) -> StoreFuture<'_, Option<Product>> {
        Box::pin(async move { rows::fetch_product(&self.pool, id).await })
    }

    fn save_product(&self, product: Product) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO products (id, name, price_pence, stock)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name,
                    price_pence = EXCLUDED.price_pence,
                    stock = EXCLUDED.stock
                ",
            )
            .bind(*product.id.as_uuid())
            .bind(&product.name)
            .bind(to_pence(product.price)?)
            .bind(to_count(product.stock)?)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
            Ok(())
        })
    }
}

impl CartStore for PostgresStore {
    fn get_cart(&self, user: UserId) -> StoreFuture<'_, Option<Cart>> {
        Box::pin(async move { rows::fetch_cart(&self.pool, user, false).await })
    }

    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, ()> {
        Box::pin(async move { rows::upsert_cart(&self.pool, &cart).await })
    }
}

impl OrderStore for PostgresStore {
    fn get_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {} FROM orders WHERE id = $1",
                rows::ORDER_COLUMNS
            ))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
            row.as_ref().map(rows::order_from_row).transpose()
        })
    }

    fn orders_due(
        &self,
        status: OrderStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Order>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {}
                FROM orders
                WHERE status = $1
                  AND estimated_delivery_date >= $2
                  AND estimated_delivery_date < $3
                ORDER BY estimated_delivery_date
                ",
                rows::ORDER_COLUMNS
            ))
            .bind(status.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
            rows.iter().map(rows::order_from_row).collect()
        })
    }
}
