//! HTTP-level middleware (cross-cutting concerns).
//!
//! Responsibility:
//! - Request-Id generation + propagation (X-Request-Id)
//! - Access logging / request tracing (TraceLayer)
//! - Body size limits
//! - Global timeouts, rendered in the same JSON error shape as gate failures
//!
//! Notes:
//! - The identity provider call inside the gate is bounded by its own HTTP client
//!   timeout; `REQUEST_TIMEOUT` here is the outer bound for the whole request.

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::header::HeaderName;
use tower::timeout::{TimeoutLayer, error::Elapsed};
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;

const REQUEST_ID_HEADER: &str = "x-request-id";
// No endpoint accepts a body; bearer tokens travel in headers.
const BODY_LIMIT_BYTES: usize = 64 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn apply(router: Router) -> Router {
    apply_with_timeout(router, REQUEST_TIMEOUT)
}

fn apply_with_timeout(router: Router, timeout: Duration) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            service_error(err)
        }))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}

fn service_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        tracing::warn!("request timed out");
        AppError::RequestTimeout
    } else {
        tracing::error!(error = %err, "unhandled service error");
        AppError::Internal
    }
}
