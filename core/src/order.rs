//! Orders produced by checkout.
//!
//! An order's item list is a snapshot taken inside the checkout unit of
//! work and never changes afterwards; only `status` and `admin_notes` are
//! mutable.

use crate::address::{BankDetails, ShippingDetails};
use crate::booking::Owned;
use crate::error::RentalError;
use crate::ids::{OrderId, ProductId, UserId};
use crate::money::Money;
use crate::range::DateRange;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Order status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation.
    #[default]
    Pending,
    /// Accepted by staff.
    Confirmed,
    /// Out for delivery.
    Shipped,
    /// Delivered.
    Delivered,
    /// Cancelled.
    Cancelled,
}

impl OrderStatus {
    /// String form used on the wire and in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(RentalError::BadRequest(format!("Invalid order status '{other}'"))),
        }
    }
}

/// How the customer pays. No gateway is involved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid on delivery.
    #[default]
    CashOnDelivery,
    /// Manual bank transfer.
    BankTransfer,
    /// Invoice; requires bank details.
    Invoice,
}

impl PaymentMethod {
    /// String form used on the wire and in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash_on_delivery",
            Self::BankTransfer => "bank_transfer",
            Self::Invoice => "invoice",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "bank_transfer" => Ok(Self::BankTransfer),
            "invoice" => Ok(Self::Invoice),
            other => Err(RentalError::BadRequest(format!("Invalid payment method '{other}'"))),
        }
    }
}

/// Delivery time slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliverySlot {
    /// 8am to 12pm, free.
    #[serde(rename = "8am-12pm")]
    Morning,
    /// 12pm to 4pm.
    #[serde(rename = "12pm-4pm")]
    Afternoon,
    /// 4pm to 8pm.
    #[serde(rename = "4pm-8pm")]
    Evening,
    /// After 8pm.
    #[serde(rename = "after-8pm")]
    Late,
}

impl DeliverySlot {
    /// Surcharge for the slot.
    #[must_use]
    pub const fn fee(&self) -> Money {
        match self {
            Self::Morning => Money::ZERO,
            Self::Afternoon | Self::Evening | Self::Late => Money::from_pounds(10),
        }
    }
}

/// Collection time slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionSlot {
    /// Before 5pm, free.
    #[serde(rename = "before-5pm")]
    BeforeFive,
    /// After 5pm.
    #[serde(rename = "after-5pm")]
    AfterFive,
    /// The following day.
    #[serde(rename = "next-day")]
    NextDay,
}

impl CollectionSlot {
    /// Surcharge for the slot.
    #[must_use]
    pub const fn fee(&self) -> Money {
        match self {
            Self::BeforeFive => Money::ZERO,
            Self::AfterFive | Self::NextDay => Money::from_pounds(10),
        }
    }
}

/// Occasion the hire is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HireOccasion {
    /// `birthday`
    Birthday,
    /// `wedding`
    Wedding,
    /// `corporate-event`
    CorporateEvent,
    /// `school-event`
    SchoolEvent,
    /// `community-event`
    CommunityEvent,
    /// `private-party`
    PrivateParty,
    /// `other`
    Other,
}

/// Surcharge for keeping equipment overnight.
pub const OVERNIGHT_FEE: Money = Money::from_pounds(30);

/// Optional order details that may add fees.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderExtras {
    /// Delivery slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_slot: Option<DeliverySlot>,
    /// Collection slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_slot: Option<CollectionSlot>,
    /// Keep equipment overnight.
    #[serde(default)]
    pub keep_overnight: bool,
    /// Occasion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_occasion: Option<HireOccasion>,
    /// Free-text notes from the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
}

impl OrderExtras {
    /// Sum of all surcharges.
    #[must_use]
    pub fn fees(&self) -> Money {
        let delivery = self.delivery_slot.map_or(Money::ZERO, |slot| slot.fee());
        let collection = self.collection_slot.map_or(Money::ZERO, |slot| slot.fee());
        let overnight = if self.keep_overnight {
            OVERNIGHT_FEE
        } else {
            Money::ZERO
        };
        delivery + collection + overnight
    }
}

/// Snapshot of one cart line at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product.
    pub product: ProductId,
    /// Product name at checkout time.
    pub name: String,
    /// Units.
    pub quantity: u32,
    /// Unit price from the cart.
    pub price: Money,
    /// Rental period, if the line had one.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub period: Option<DateRange>,
}

/// A placed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id.
    pub id: OrderId,
    /// Human-facing unique number, e.g. `ORD2406011234`.
    pub order_number: String,
    /// Ordering user.
    pub user: UserId,
    /// Item snapshots.
    pub items: Vec<OrderItem>,
    /// Items plus fees.
    pub total_amount: Money,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Bank details, present for invoice payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
    /// Status.
    pub status: OrderStatus,
    /// Shipping and billing details.
    pub shipping_address: ShippingDetails,
    /// Optional slots and notes.
    #[serde(default)]
    pub extras: OrderExtras,
    /// Expected delivery.
    pub estimated_delivery_date: DateTime<Utc>,
    /// Notes added by staff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Owned for Order {
    fn owner_id(&self) -> UserId {
        self.user
    }
}

/// Generate an order number: `ORD`, the date as `yyMMdd`, then four random
/// digits in `1000..=9999`.
#[must_use]
pub fn generate_order_number<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: u16 = rng.gen_range(1000..=9999);
    format!("ORD{}{suffix}", now.format("%y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let number = generate_order_number(now, &mut rand::thread_rng());
        assert_eq!(number.len(), 13);
        assert!(number.starts_with("ORD240601"));
        let suffix: u16 = number[9..].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
    }

    #[test]
    fn test_fees() {
        assert_eq!(OrderExtras::default().fees(), Money::ZERO);

        let extras = OrderExtras {
            delivery_slot: Some(DeliverySlot::Evening),
            collection_slot: Some(CollectionSlot::BeforeFive),
            keep_overnight: true,
            ..OrderExtras::default()
        };
        assert_eq!(extras.fees(), Money::from_pounds(40));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_slot_wire_names() {
        let slot: DeliverySlot = serde_json::from_str("\"after-8pm\"").unwrap();
        assert_eq!(slot, DeliverySlot::Late);
        let occasion: HireOccasion = serde_json::from_str("\"corporate-event\"").unwrap();
        assert_eq!(occasion, HireOccasion::CorporateEvent);
        assert_eq!(
            "invoice".parse::<PaymentMethod>().ok(),
            Some(PaymentMethod::Invoice)
        );
    }
}
