//! Outbound customer notifications.
//!
//! Mail delivery is an external collaborator. Services only call it after a
//! commit and never let its failure undo committed work.

use crate::order::Order;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Notification failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport rejected or lost the message.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Future returned by [`Notifier`] methods.
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Sends order-related messages to customers.
pub trait Notifier: Send + Sync {
    /// Sent once an order has been committed.
    fn order_confirmation<'a>(&'a self, order: &'a Order) -> NotifyFuture<'a>;

    /// Sent ahead of an order's estimated delivery date.
    fn delivery_reminder<'a>(&'a self, order: &'a Order) -> NotifyFuture<'a>;
}
