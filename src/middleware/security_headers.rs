//! Security-related response headers for browser clients.
//!
//! Applied at the Router level so that gate rejections (401/503) carry them too.
//! Every response of this API is either identity data or an auth failure, so none of
//! them may be framed, sniffed or stored by shared caches.

use axum::Router;
use axum::http::header::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

/// (header, value) pairs set on every response unless the handler already set them.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-frame-options", "DENY"),
    ("content-security-policy", "frame-ancestors 'none'"),
    ("x-content-type-options", "nosniff"),
    ("cache-control", "no-store"),
    ("referrer-policy", "no-referrer"),
];

pub fn apply(router: Router) -> Router {
    SECURITY_HEADERS
        .iter()
        .fold(router, |router, &(name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}
