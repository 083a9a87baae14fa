//! Axum HTTP surface for the rental reservation and checkout core.
//!
//! This crate is a thin shell: handlers extract the caller and input, call
//! one service method from `rental-runtime`, and map the result.
//!
//! # Request Flow
//!
//! 1. [`middleware::request_context_layer`] assigns a correlation id and
//!    opens a span
//! 2. [`extractors::AuthUser`] reads the identity the upstream auth layer
//!    forwarded
//! 3. The handler calls the service
//! 4. [`AppError`] renders any [`rental_core::RentalError`] as
//!    `{"status": "fail" | "error", "message": ...}` with the taxonomy's
//!    status code
//!
//! # Example
//!
//! ```ignore
//! use rental_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(&env));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{AuthUser, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, request_context_layer};
pub use router::build_router;
pub use state::{AlwaysReady, AppState, ReadinessCheck, ReadinessFuture};
