//! Cart to order conversion.
//!
//! A checkout is one [`CheckoutTransaction`]: the cart read, every stock
//! decrement, the order insert and the cart clear commit together or not at
//! all. Validation that needs no store access runs before the transaction
//! opens. The whole unit of work is bounded by
//! [`RentalSettings::checkout_timeout`](rental_core::RentalSettings); when
//! it elapses the transaction is dropped, which rolls it back.
//!
//! The order-confirmation notification is sent after commit on a spawned
//! task, retried with back-off, and never affects the checkout result.

use crate::RentalEnvironment;
use crate::metrics::{counter, failure_reason, histogram};
use crate::retry::retry_with_backoff;
use rental_core::address::{BankDetails, ShippingDetails};
use rental_core::cart::CartItem;
use rental_core::order::{
    Order, OrderExtras, OrderItem, OrderStatus, PaymentMethod, generate_order_number,
};
use rental_core::product::Product;
use rental_core::store::CheckoutTransaction;
use rental_core::{Caller, Money, OrderId, RentalError, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// What the customer submits at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Shipping contact and address, plus billing when different.
    pub shipping_address: ShippingDetails,
    /// How the order will be paid.
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Terms and conditions acknowledgement.
    #[serde(default)]
    pub terms_accepted: bool,
    /// Required for invoice payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
    /// Slots, overnight hire, occasion and notes.
    #[serde(flatten)]
    pub extras: OrderExtras,
}

impl CheckoutRequest {
    /// Checks that need no store access.
    ///
    /// # Errors
    ///
    /// `BadRequest` when terms are not accepted, an address field is
    /// missing, or an invoice payment lacks bank details.
    pub fn validate(&self) -> Result<(), RentalError> {
        if !self.terms_accepted {
            return Err(RentalError::BadRequest(
                "You must accept the terms and conditions".to_string(),
            ));
        }
        self.shipping_address.validate()?;
        if self.payment_method == PaymentMethod::Invoice
            && !self.bank_details.as_ref().is_some_and(BankDetails::is_complete)
        {
            return Err(RentalError::BadRequest(
                "Bank details are required for invoice payments".to_string(),
            ));
        }
        Ok(())
    }
}

/// Converts carts into orders.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    env: RentalEnvironment,
}

impl CheckoutService {
    /// Create the service.
    #[must_use]
    pub const fn new(env: RentalEnvironment) -> Self {
        Self { env }
    }

    /// Turn the caller's cart into an order.
    ///
    /// On success the products' stock has been decremented, the order
    /// exists and the cart is empty, all in one commit. On any error none
    /// of that happened.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: validation failures, empty cart, insufficient stock
    /// - `NotFound`: a product in the cart no longer exists
    /// - `Conflict`: a dated item's range is booked, or a concurrent
    ///   checkout took the remaining stock first
    /// - `Internal`: store failure, commit failure or timeout
    pub async fn checkout(
        &self,
        caller: &Caller,
        request: CheckoutRequest,
    ) -> Result<Order, RentalError> {
        if let Err(err) = request.validate() {
            counter!("checkouts_failed_total", "reason" => "bad_request").increment(1);
            return Err(err);
        }

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.env.settings.checkout_timeout,
            self.place_order(caller.user_id, request),
        )
        .await;
        histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(Ok(order)) => {
                counter!("checkouts_completed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    user_id = %order.user,
                    total = %order.total_amount,
                    items = order.items.len(),
                    "Checkout committed"
                );
                self.send_confirmation(order.clone());
                Ok(order)
            }
            Ok(Err(err)) => {
                counter!("checkouts_failed_total", "reason" => failure_reason(err.status_code()))
                    .increment(1);
                if err.is_client_error() {
                    tracing::debug!(user_id = %caller.user_id, error = %err, "Checkout rejected");
                } else {
                    tracing::error!(user_id = %caller.user_id, error = %err, "Checkout failed");
                }
                Err(err)
            }
            Err(_) => {
                counter!("checkouts_failed_total", "reason" => "timeout").increment(1);
                tracing::error!(
                    user_id = %caller.user_id,
                    timeout_ms = u64::try_from(self.env.settings.checkout_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                    "Checkout timed out and was rolled back"
                );
                Err(RentalError::Internal("Checkout timed out".to_string()))
            }
        }
    }

    async fn place_order(&self, user: UserId, request: CheckoutRequest) -> Result<Order, RentalError> {
        let mut tx = self.env.checkout.begin().await?;
        match self.stage(tx.as_mut(), user, request).await {
            Ok(order) => {
                tx.commit().await?;
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Checkout rollback reported an error");
                }
                Err(err)
            }
        }
    }

    /// Every write of the checkout, in order. Nothing here is visible until
    /// the caller commits.
    async fn stage(
        &self,
        tx: &mut dyn CheckoutTransaction,
        user: UserId,
        request: CheckoutRequest,
    ) -> Result<Order, RentalError> {
        let now = self.env.clock.now();
        let mut cart = tx
            .load_cart(user)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| RentalError::BadRequest("Cart is empty".to_string()))?;

        let mut lines: Vec<(&CartItem, Product)> = Vec::with_capacity(cart.items.len());
        for line in &cart.items {
            let product = tx
                .load_product(line.product)
                .await?
                .ok_or_else(|| RentalError::NotFound("Product not found".to_string()))?;
            if !product.has_stock_for(line.quantity) {
                return Err(RentalError::BadRequest(format!(
                    "Insufficient stock for {}. Available: {}, Requested: {}",
                    product.name, product.stock, line.quantity
                )));
            }
            if let Some(period) = line.period {
                if tx.find_conflict(product.id, period).await?.is_some() {
                    return Err(RentalError::Conflict(format!(
                        "Selected dates are not available for {}",
                        product.name
                    )));
                }
            }
            lines.push((line, product));
        }

        let mut items = Vec::with_capacity(lines.len());
        for (line, product) in lines {
            if !tx.decrement_stock(product.id, line.quantity).await? {
                tracing::warn!(
                    product_id = %product.id,
                    requested = line.quantity,
                    "Stock taken by a concurrent checkout"
                );
                return Err(RentalError::Conflict(format!(
                    "Stock for {} changed during checkout, please try again",
                    product.name
                )));
            }
            items.push(OrderItem {
                product: product.id,
                name: product.name,
                quantity: line.quantity,
                price: line.price,
                period: line.period,
            });
        }

        let subtotal: Money = cart.items.iter().map(CartItem::subtotal).sum();
        let mut order = Order {
            id: OrderId::new(),
            order_number: String::new(),
            user,
            items,
            total_amount: subtotal + request.extras.fees(),
            payment_method: request.payment_method,
            bank_details: request.bank_details,
            status: OrderStatus::Pending,
            shipping_address: request.shipping_address,
            extras: request.extras,
            estimated_delivery_date: now + self.env.settings.delivery_offset,
            admin_notes: None,
            created_at: now,
        };

        let mut placed = false;
        for attempt in 1..=self.env.settings.order_number_attempts {
            order.order_number = generate_order_number(now, &mut rand::thread_rng());
            if tx.insert_order(order.clone()).await? {
                placed = true;
                break;
            }
            tracing::debug!(attempt, order_number = %order.order_number, "Order number taken");
        }
        if !placed {
            return Err(RentalError::Internal(
                "Could not allocate a unique order number".to_string(),
            ));
        }

        cart.clear(now);
        tx.save_cart(cart).await?;
        Ok(order)
    }

    fn send_confirmation(&self, order: Order) {
        let notifier = Arc::clone(&self.env.notifier);
        let policy = self.env.notify_retry;
        tokio::spawn(async move {
            let sent = retry_with_backoff(&policy, || notifier.order_confirmation(&order)).await;
            if let Err(err) = sent {
                counter!("notifications_failed_total", "kind" => "order_confirmation").increment(1);
                tracing::warn!(
                    order_number = %order.order_number,
                    error = %err,
                    "Order confirmation could not be sent"
                );
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete_shipping() -> ShippingDetails {
        ShippingDetails {
            first_name: Some("Grace".into()),
            last_name: Some("Hopper".into()),
            email: Some("grace@example.com".into()),
            phone: Some("07700900001".into()),
            street: Some("2 Compiler Road".into()),
            city: Some("Leeds".into()),
            state: Some("West Yorkshire".into()),
            country: Some("UK".into()),
            zip_code: Some("LS1 1AA".into()),
            ..ShippingDetails::default()
        }
    }

    #[test]
    fn test_terms_must_be_accepted() {
        let request = CheckoutRequest {
            shipping_address: complete_shipping(),
            ..CheckoutRequest::default()
        };
        assert_eq!(
            request.validate(),
            Err(RentalError::BadRequest(
                "You must accept the terms and conditions".to_string()
            ))
        );
    }

    #[test]
    fn test_invoice_requires_bank_details() {
        let mut request = CheckoutRequest {
            shipping_address: complete_shipping(),
            payment_method: PaymentMethod::Invoice,
            terms_accepted: true,
            ..CheckoutRequest::default()
        };
        assert!(request.validate().is_err());

        request.bank_details = Some(BankDetails {
            bank_name: "Northern Bank".into(),
            account_number: "12345678".into(),
            account_holder: "Grace Hopper".into(),
        });
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn test_request_reads_flattened_extras() {
        let json = serde_json::json!({
            "shippingAddress": { "firstName": "Grace" },
            "termsAccepted": true,
            "paymentMethod": "bank_transfer",
            "deliverySlot": "4pm-8pm",
            "keepOvernight": true
        });
        let request: CheckoutRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::BankTransfer);
        assert!(request.extras.keep_overnight);
        assert_eq!(request.extras.fees(), Money::from_pounds(40));
    }
}
