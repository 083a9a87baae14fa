//! Error taxonomy.
//!
//! [`RentalError`] is what services return. Each variant carries the
//! user-facing message and maps to exactly one HTTP status code via
//! [`RentalError::status_code`]. [`StoreError`] is what storage backends
//! report; it converts into `RentalError` so services can use `?` directly.

use crate::ids::ProductId;
use thiserror::Error;

/// Errors reported by storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write would violate a uniqueness or exclusion rule, or lost a race
    /// against a concurrent writer.
    #[error("{0}")]
    Conflict(String),

    /// The addressed record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A conditional stock decrement found fewer units than requested.
    #[error("Insufficient stock for product {product}: available {available}, requested {requested}")]
    InsufficientStock {
        /// Product whose stock was short.
        product: ProductId,
        /// Units available when the write was attempted.
        available: u32,
        /// Units requested.
        requested: u32,
    },

    /// Connection, query or commit failure.
    #[error("Database error: {0}")]
    Database(String),

    /// The unit of work did not finish in time and was abandoned.
    #[error("Operation timed out")]
    Timeout,
}

/// Service-level error taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RentalError {
    /// Malformed input, invalid date range, missing fields, insufficient
    /// stock, empty cart, terms not accepted.
    #[error("{0}")]
    BadRequest(String),

    /// No authenticated identity.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but acting on someone else's resource without the
    /// admin role.
    #[error("{0}")]
    Forbidden(String),

    /// Booking, product or order absent.
    #[error("{0}")]
    NotFound(String),

    /// Date overlap, non-editable status, lost stock race.
    #[error("{0}")]
    Conflict(String),

    /// Transaction, commit or unexpected store failure.
    #[error("{0}")]
    Internal(String),
}

impl RentalError {
    /// Numeric HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// The user-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m) => m,
        }
    }

    /// Whether this error was caused by the caller (4xx) rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

impl From<StoreError> for RentalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            StoreError::InsufficientStock { .. } => Self::Conflict(err.to_string()),
            StoreError::Database(_) | StoreError::Timeout => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RentalError::BadRequest(String::new()).status_code(), 400);
        assert_eq!(RentalError::Unauthorized(String::new()).status_code(), 401);
        assert_eq!(RentalError::Forbidden(String::new()).status_code(), 403);
        assert_eq!(RentalError::NotFound(String::new()).status_code(), 404);
        assert_eq!(RentalError::Conflict(String::new()).status_code(), 409);
        assert_eq!(RentalError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_store_errors_map_onto_taxonomy() {
        let conflict: RentalError = StoreError::Conflict("overlap".into()).into();
        assert_eq!(conflict.status_code(), 409);

        let missing: RentalError = StoreError::NotFound("Booking".into()).into();
        assert_eq!(missing.message(), "Booking not found");

        let db: RentalError = StoreError::Database("connection reset".into()).into();
        assert_eq!(db.status_code(), 500);
        assert!(!db.is_client_error());

        let timeout: RentalError = StoreError::Timeout.into();
        assert_eq!(timeout.status_code(), 500);
    }
}
