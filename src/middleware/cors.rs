//! CORS policy for browser clients (the Angular frontend).
//!
//! Note:
//! - CORS is enforced by browsers. Native mobile apps and server-to-server calls are not
//!   restricted by CORS.
//! - This middleware should be applied at the Router level (not inside handlers).
//!
//! Policy:
//! - Allowlist origins from Config (`CORS_ALLOWED_ORIGINS`, comma-separated), WITHOUT credentials.
//!   Tokens travel in the Authorization header, so cookies are never needed.
//! - Development with an empty allowlist: permissive (Allow-Origin: *).
//! - Production with an empty allowlist: no origin is allowed.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

/// Apply CORS policy to the given Router.
///
/// IMPORTANT:
/// - Do not combine wildcard origin (`Any`) with `allow_credentials(true)`.
pub fn apply(router: Router, config: &Config) -> Router {
    let allowed: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|s| match HeaderValue::from_str(s) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %s, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = if allowed.is_empty() && !config.app_env.is_production() {
        CorsLayer::new().allow_origin(Any)
    } else {
        // Exact match only. An empty allowlist in production allows none,
        // which is safer than accidentally allowing all.
        let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
            allowed.iter().any(|v| v == origin)
        });
        CorsLayer::new().allow_origin(allow_origin)
    }
    .allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    .max_age(Duration::from_secs(12 * 60 * 60));

    router.layer(cors)
}
