//! Delivery reminder notifications.

use crate::RentalEnvironment;
use crate::metrics::counter;
use crate::retry::retry_with_backoff;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use rental_core::RentalError;
use rental_core::order::OrderStatus;

/// Sends reminders for confirmed orders delivering soon.
#[derive(Debug, Clone)]
pub struct DeliveryReminders {
    env: RentalEnvironment,
    lead: TimeDelta,
}

impl DeliveryReminders {
    /// Remind two days ahead.
    #[must_use]
    pub fn new(env: RentalEnvironment) -> Self {
        Self {
            env,
            lead: TimeDelta::days(2),
        }
    }

    /// Remind `lead` ahead instead.
    #[must_use]
    pub fn with_lead(mut self, lead: TimeDelta) -> Self {
        self.lead = lead;
        self
    }

    /// Remind every confirmed order whose estimated delivery falls on the
    /// calendar day (UTC) `lead` after `now`. Returns how many were sent.
    ///
    /// Best effort: a reminder that still fails after retrying is logged
    /// and counted, and the rest are still sent.
    ///
    /// # Errors
    ///
    /// Only if the due orders cannot be listed.
    pub async fn send_due(&self, now: DateTime<Utc>) -> Result<usize, RentalError> {
        let Some(target) = now.checked_add_signed(self.lead) else {
            return Ok(0);
        };
        let from = target.date_naive().and_time(NaiveTime::MIN).and_utc();
        let to = from + TimeDelta::days(1);

        let orders = self
            .env
            .orders
            .orders_due(OrderStatus::Confirmed, from, to)
            .await?;

        let mut sent = 0usize;
        for order in &orders {
            let notifier = &self.env.notifier;
            match retry_with_backoff(&self.env.notify_retry, || notifier.delivery_reminder(order)).await {
                Ok(()) => sent += 1,
                Err(err) => {
                    counter!("notifications_failed_total", "kind" => "delivery_reminder").increment(1);
                    tracing::warn!(
                        order_number = %order.order_number,
                        error = %err,
                        "Delivery reminder could not be sent"
                    );
                }
            }
        }

        tracing::info!(due = orders.len(), sent, day = %from.date_naive(), "Delivery reminders sent");
        Ok(sent)
    }

    /// One pass using the environment's clock.
    ///
    /// # Errors
    ///
    /// See [`DeliveryReminders::send_due`].
    pub async fn run_once(&self) -> Result<usize, RentalError> {
        self.send_due(self.env.clock.now()).await
    }
}
