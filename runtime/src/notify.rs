//! Production notifier.

use rental_core::notify::{Notifier, NotifyFuture};
use rental_core::order::Order;

/// Notifier that records each notification as a structured log event.
///
/// Mail delivery lives outside this core; deployments that send real mail
/// supply their own [`Notifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn order_confirmation<'a>(&'a self, order: &'a Order) -> NotifyFuture<'a> {
        Box::pin(async move {
            tracing::info!(
                order_number = %order.order_number,
                user_id = %order.user,
                email = order.shipping_address.email.as_deref().unwrap_or_default(),
                total = %order.total_amount,
                "Order confirmation"
            );
            Ok(())
        })
    }

    fn delivery_reminder<'a>(&'a self, order: &'a Order) -> NotifyFuture<'a> {
        Box::pin(async move {
            tracing::info!(
                order_number = %order.order_number,
                user_id = %order.user,
                delivery = %order.estimated_delivery_date.date_naive(),
                "Delivery reminder"
            );
            Ok(())
        })
    }
}
