//! Per-user shopping cart.
//!
//! One cart per user, created lazily. `total_items` and `total_price` are
//! derived and recomputed by every mutating method, so they are always in
//! sync with `items`.

use crate::booking::Owned;
use crate::error::RentalError;
use crate::ids::{ProductId, UserId};
use crate::money::Money;
use crate::range::DateRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of a cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product in the line.
    pub product: ProductId,
    /// Units, at least one.
    pub quantity: u32,
    /// Unit price when the line was last written. Checkout charges this.
    pub price: Money,
    /// Optional rental period.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub period: Option<DateRange>,
}

impl CartItem {
    /// `quantity * price`.
    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// A user's cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Owner; unique per cart.
    pub user: UserId,
    /// Lines, at most one per product. A line keeps the rental period it
    /// was first added with.
    pub items: Vec<CartItem>,
    /// Sum of quantities.
    pub total_items: u32,
    /// Sum of subtotals.
    pub total_price: Money,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Owned for Cart {
    fn owner_id(&self) -> UserId {
        self.user
    }
}

impl Cart {
    /// An empty cart for `user`.
    #[must_use]
    pub const fn empty(user: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user,
            items: Vec::new(),
            total_items: 0,
            total_price: Money::ZERO,
            updated_at: now,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line for `product`, if any.
    #[must_use]
    pub fn item(&self, product: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product == product)
    }

    /// Add `item`, merging with an existing line for the same product.
    ///
    /// A merged line takes the newer price snapshot. An undated add joins
    /// the existing line whatever its period.
    ///
    /// # Errors
    ///
    /// `BadRequest` when `item` is dated and the existing line for the
    /// product has a different period (or none). The cart is unchanged.
    pub fn add(&mut self, item: CartItem, now: DateTime<Utc>) -> Result<(), RentalError> {
        match self.items.iter_mut().find(|line| line.product == item.product) {
            Some(line) => {
                if item.period.is_some() && line.period != item.period {
                    return Err(RentalError::BadRequest(
                        "Product is already in the cart for different dates".to_string(),
                    ));
                }
                line.quantity = line.quantity.saturating_add(item.quantity);
                line.price = item.price;
            }
            None => self.items.push(item),
        }
        self.touch(now);
        Ok(())
    }

    /// Set the quantity of an existing line. Returns `false` when the
    /// product is not in the cart.
    pub fn set_quantity(&mut self, product: ProductId, quantity: u32, now: DateTime<Utc>) -> bool {
        let Some(line) = self.items.iter_mut().find(|line| line.product == product) else {
            return false;
        };
        line.quantity = quantity;
        self.touch(now);
        true
    }

    /// Remove the line for `product`. Returns whether a line was removed.
    pub fn remove(&mut self, product: ProductId, now: DateTime<Utc>) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.product != product);
        let removed = self.items.len() != before;
        self.touch(now);
        removed
    }

    /// Drop every line.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.total_items = self
            .items
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity));
        self.total_price = self.items.iter().map(CartItem::subtotal).sum();
        self.updated_at = now;
    }
}
