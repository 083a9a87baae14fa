//! The staging list checkout consumes.

use crate::RentalEnvironment;
use chrono::{DateTime, Utc};
use rental_core::cart::{Cart, CartItem};
use rental_core::product::Product;
use rental_core::{Caller, DateRange, ProductId, RentalError, UserId};
use serde::{Deserialize, Serialize};

const fn one() -> u32 {
    1
}

/// Request to add a product to the cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    /// Product to add.
    pub product: ProductId,
    /// Units to add; defaults to one.
    #[serde(default = "one")]
    pub quantity: u32,
    /// Rental start, required together with `end_date`.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Rental end, required together with `start_date`.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

/// Cart operations. A cart is created the first time a user touches it.
#[derive(Debug, Clone)]
pub struct CartService {
    env: RentalEnvironment,
}

impl CartService {
    /// Create the service.
    #[must_use]
    pub const fn new(env: RentalEnvironment) -> Self {
        Self { env }
    }

    /// The caller's cart, created empty if they have none.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn get(&self, caller: &Caller) -> Result<Cart, RentalError> {
        if let Some(cart) = self.env.carts.get_cart(caller.user_id).await? {
            return Ok(cart);
        }
        let cart = Cart::empty(caller.user_id, self.env.clock.now());
        self.env.carts.save_cart(cart.clone()).await?;
        tracing::debug!(user_id = %caller.user_id, "Cart created");
        Ok(cart)
    }

    /// Add units of a product, snapshotting its current price.
    ///
    /// # Errors
    ///
    /// - `BadRequest` for a zero quantity, a half-given or inverted range,
    ///   a start in the past, more units than are in stock, or dates that
    ///   differ from the product's existing line
    /// - `NotFound` if the product does not exist
    pub async fn add_item(&self, caller: &Caller, request: AddItem) -> Result<Cart, RentalError> {
        ensure_positive(request.quantity)?;
        let now = self.env.clock.now();
        let period = DateRange::from_optional(request.start_date, request.end_date)?;
        if period.is_some_and(|period| period.start() < now) {
            return Err(RentalError::BadRequest(
                "startDate cannot be in the past".to_string(),
            ));
        }

        let product = self.product(request.product).await?;
        let mut cart = self.load(caller.user_id, now).await?;
        let in_cart = cart.item(product.id).map_or(0, |line| line.quantity);
        ensure_stock(&product, in_cart.saturating_add(request.quantity))?;

        cart.add(
            CartItem {
                product: product.id,
                quantity: request.quantity,
                price: product.price,
                period,
            },
            now,
        )?;
        self.env.carts.save_cart(cart.clone()).await?;
        tracing::debug!(
            user_id = %caller.user_id,
            product_id = %product.id,
            quantity = request.quantity,
            "Cart item added"
        );
        Ok(cart)
    }

    /// Set the quantity of a line already in the cart.
    ///
    /// # Errors
    ///
    /// `BadRequest` for zero or more than in stock, `NotFound` when the
    /// product or the line is missing.
    pub async fn update_item(
        &self,
        caller: &Caller,
        product: ProductId,
        quantity: u32,
    ) -> Result<Cart, RentalError> {
        ensure_positive(quantity)?;
        let product = self.product(product).await?;
        ensure_stock(&product, quantity)?;

        let now = self.env.clock.now();
        let mut cart = self.load(caller.user_id, now).await?;
        if !cart.set_quantity(product.id, quantity, now) {
            return Err(item_not_found());
        }
        self.env.carts.save_cart(cart.clone()).await?;
        Ok(cart)
    }

    /// Drop a line.
    ///
    /// # Errors
    ///
    /// `NotFound` when the line is missing.
    pub async fn remove_item(&self, caller: &Caller, product: ProductId) -> Result<Cart, RentalError> {
        let now = self.env.clock.now();
        let mut cart = self.load(caller.user_id, now).await?;
        if !cart.remove(product, now) {
            return Err(item_not_found());
        }
        self.env.carts.save_cart(cart.clone()).await?;
        Ok(cart)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn clear(&self, caller: &Caller) -> Result<Cart, RentalError> {
        let now = self.env.clock.now();
        let mut cart = self.load(caller.user_id, now).await?;
        cart.clear(now);
        self.env.carts.save_cart(cart.clone()).await?;
        Ok(cart)
    }

    async fn load(&self, user: UserId, now: DateTime<Utc>) -> Result<Cart, RentalError> {
        Ok(self
            .env
            .carts
            .get_cart(user)
            .await?
            .unwrap_or_else(|| Cart::empty(user, now)))
    }

    async fn product(&self, id: ProductId) -> Result<Product, RentalError> {
        self.env
            .products
            .get_product(id)
            .await?
            .ok_or_else(|| RentalError::NotFound("Product not found".to_string()))
    }
}

fn ensure_positive(quantity: u32) -> Result<(), RentalError> {
    if quantity == 0 {
        return Err(RentalError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn ensure_stock(product: &Product, requested: u32) -> Result<(), RentalError> {
    if product.has_stock_for(requested) {
        Ok(())
    } else {
        Err(RentalError::BadRequest(format!(
            "Insufficient stock for {}. Available: {}, Requested: {requested}",
            product.name, product.stock
        )))
    }
}

fn item_not_found() -> RentalError {
    RentalError::NotFound("Item not found in cart".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_defaults_to_one_unit() {
        let json = serde_json::json!({ "product": ProductId::new() });
        let request: AddItem = serde_json::from_value(json).unwrap();
        assert_eq!(request.quantity, 1);
        assert!(request.start_date.is_none());
    }

    #[test]
    fn test_stock_message_names_product() {
        let product = Product::new("Gazebo", rental_core::Money::from_pounds(80), 2);
        let err = ensure_stock(&product, 3).unwrap_err();
        assert_eq!(
            err.message(),
            "Insufficient stock for Gazebo. Available: 2, Requested: 3"
        );
        assert!(ensure_stock(&product, 2).is_ok());
    }
}
