//! Products as seen by the reservation and checkout core.
//!
//! Catalog management lives elsewhere; this core only reads `name`,
//! `price` and `stock`, and decrements `stock` inside a committed checkout.

use crate::ids::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A rentable product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product id.
    pub id: ProductId,
    /// Display name, snapshotted onto order items.
    pub name: String,
    /// Current unit price, snapshotted onto cart items.
    pub price: Money,
    /// Purchasable units. Unsigned, so it can never go negative.
    pub stock: u32,
}

impl Product {
    /// Create a product with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            price,
            stock,
        }
    }

    /// Whether `quantity` units can be taken right now.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
