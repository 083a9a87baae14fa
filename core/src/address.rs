//! Address shapes and field-presence validation.
//!
//! Two shapes exist: the postal address attached to bookings and the
//! shipping/billing details collected at checkout. Both validate by
//! field presence only; a blank or whitespace-only string counts as missing.

use crate::error::RentalError;
use serde::{Deserialize, Serialize};

/// Names of required fields that are absent or blank.
fn missing<'a>(fields: &[(&'a str, Option<&str>)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect()
}

fn reject_missing(prefix: &str, names: &[&str]) -> Result<(), RentalError> {
    if names.is_empty() {
        Ok(())
    } else {
        Err(RentalError::BadRequest(format!("{prefix}: {}", names.join(", "))))
    }
}

/// Postal address stored on a booking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingAddress {
    /// Recipient name.
    #[serde(default)]
    pub full_name: String,
    /// First address line.
    #[serde(default)]
    pub line1: String,
    /// Second address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City or town.
    #[serde(default)]
    pub city: String,
    /// County or state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub postal_code: String,
    /// Country.
    #[serde(default)]
    pub country: String,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl BookingAddress {
    /// Check that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns [`RentalError::BadRequest`] listing the missing field names.
    pub fn validate(&self) -> Result<(), RentalError> {
        let names = missing(&[
            ("fullName", Some(self.full_name.as_str())),
            ("line1", Some(self.line1.as_str())),
            ("city", Some(self.city.as_str())),
            ("postalCode", Some(self.postal_code.as_str())),
            ("country", Some(self.country.as_str())),
        ]);
        reject_missing("Missing required address fields", &names)
    }
}

/// Shipping contact and address collected at checkout, with an optional
/// separate billing address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    /// Contact first name.
    pub first_name: Option<String>,
    /// Contact last name.
    pub last_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Street address.
    pub street: Option<String>,
    /// City or town.
    pub city: Option<String>,
    /// County or state.
    pub state: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// Postal code.
    pub zip_code: Option<String>,
    /// When set, the billing fields below are required.
    #[serde(default)]
    pub different_billing_address: bool,
    /// Billing first name.
    pub billing_first_name: Option<String>,
    /// Billing last name.
    pub billing_last_name: Option<String>,
    /// Billing street address.
    pub billing_street: Option<String>,
    /// Billing city.
    pub billing_city: Option<String>,
    /// Billing county or state.
    pub billing_state: Option<String>,
    /// Billing postal code.
    pub billing_zip_code: Option<String>,
}

impl ShippingDetails {
    /// Check the shipping field set, then the billing set when a different
    /// billing address was requested.
    ///
    /// # Errors
    ///
    /// Returns [`RentalError::BadRequest`] naming the missing fields.
    pub fn validate(&self) -> Result<(), RentalError> {
        let shipping = missing(&[
            ("firstName", self.first_name.as_deref()),
            ("lastName", self.last_name.as_deref()),
            ("email", self.email.as_deref()),
            ("phone", self.phone.as_deref()),
            ("street", self.street.as_deref()),
            ("city", self.city.as_deref()),
            ("state", self.state.as_deref()),
            ("country", self.country.as_deref()),
            ("zipCode", self.zip_code.as_deref()),
        ]);
        reject_missing("Missing shipping address fields", &shipping)?;

        if self.different_billing_address {
            let billing = missing(&[
                ("billingFirstName", self.billing_first_name.as_deref()),
                ("billingLastName", self.billing_last_name.as_deref()),
                ("billingStreet", self.billing_street.as_deref()),
                ("billingCity", self.billing_city.as_deref()),
                ("billingState", self.billing_state.as_deref()),
                ("billingZipCode", self.billing_zip_code.as_deref()),
            ]);
            reject_missing("Missing billing address fields", &billing)?;
        }
        Ok(())
    }
}

/// Bank details required for invoice payments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    /// Bank name.
    pub bank_name: String,
    /// Account number.
    pub account_number: String,
    /// Account holder name.
    pub account_holder: String,
}

impl BankDetails {
    /// Whether every field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        missing(&[
            ("bankName", Some(self.bank_name.as_str())),
            ("accountNumber", Some(self.account_number.as_str())),
            ("accountHolder", Some(self.account_holder.as_str())),
        ])
        .is_empty()
    }
}
