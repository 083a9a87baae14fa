//! HTTP request handlers, one module per resource.
//!
//! Successful responses share one envelope:
//!
//! ```json
//! { "status": "success", "results": 2, "data": { "bookings": [...] } }
//! ```
//!
//! `results` is present only for lists.

pub mod bookings;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod products;

use serde::Serialize;
use std::collections::BTreeMap;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    data: T,
}

impl<T> Envelope<T> {
    /// Wrap `data` as-is.
    pub const fn new(data: T) -> Self {
        Self {
            status: "success",
            results: None,
            data,
        }
    }
}

impl<T> Envelope<BTreeMap<&'static str, T>> {
    /// `data: { key: value }`.
    pub fn one(key: &'static str, value: T) -> Self {
        Self::new(BTreeMap::from([(key, value)]))
    }
}

impl<T> Envelope<BTreeMap<&'static str, Vec<T>>> {
    /// `results: n, data: { key: [...] }`.
    pub fn many(key: &'static str, values: Vec<T>) -> Self {
        let results = values.len();
        Self {
            status: "success",
            results: Some(results),
            data: BTreeMap::from([(key, values)]),
        }
    }
}
