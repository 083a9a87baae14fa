//! Request context middleware.
//!
//! Every request gets a correlation id (taken from `X-Correlation-ID` when
//! it parses as a UUID, generated otherwise), stored in the request
//! extensions, echoed in the response header and attached to an
//! `http_request` span. On completion the request is counted in
//! `http_requests_total{method, status}` and timed in
//! `http_request_duration_seconds`.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use rental_web::middleware::request_context_layer;
//!
//! let app = Router::new()
//!     .route("/bookings", get(list_bookings))
//!     .layer(request_context_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use metrics::{counter, histogram};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create the request context layer.
#[must_use]
pub const fn request_context_layer() -> RequestContextLayer {
    RequestContextLayer
}

/// Layer installing [`RequestContext`].
#[derive(Clone, Copy, Debug)]
pub struct RequestContextLayer;

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContext<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContext { inner }
    }
}

/// Middleware service adding correlation ids, spans and request metrics.
#[derive(Clone, Debug)]
pub struct RequestContext<S> {
    inner: S,
}

impl<S> Service<Request> for RequestContext<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(correlation_id);

        let method = req.method().to_string();
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %method,
            path = %req.uri().path(),
        );
        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span.clone()).await?;

            let status = response.status().as_u16().to_string();
            let elapsed = started.elapsed();
            counter!("http_requests_total", "method" => method.clone(), "status" => status.clone())
                .increment(1);
            histogram!("http_request_duration_seconds", "method" => method)
                .record(elapsed.as_secs_f64());
            span.in_scope(|| {
                tracing::debug!(
                    status = %status,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Request completed"
                );
            });

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}
