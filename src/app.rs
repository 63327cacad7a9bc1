/*
 * Responsibility
 * - Config読み込み → 依存生成 (verifier) → Router 組み立て
 * - Middleware の適用 (CORS/Security headers/HTTP 共通/Bearer gate)
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::auth::build_verifier;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,astar_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost".
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {} (gate: {:?})",
        config.app_env,
        config.addr,
        config.gate
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    // The verifier is built once here and shared read-only by every request.
    let verifier = build_verifier(config)?;
    Ok(AppState::new(verifier, config.idp_unavailable_as_503))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/healthz", get(api::health::health))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::services::auth::issue_token;

    const SECRET: &str = "router-secret";

    fn test_config() -> Config {
        Config::from_vars(|key| match key {
            "AUTH_GATE" => Some("self_issued".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn create_test_app() -> Router {
        let config = test_config();
        let state = build_state(&config).unwrap();
        build_router(state, &config)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn healthz_needs_no_credentials() {
        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();

        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(json_body(response).await["ok"], true);
    }

    #[tokio::test]
    async fn me_requires_bearer_token() {
        let request = Request::builder()
            .uri("/api/v1/me")
            .body(Body::empty())
            .unwrap();

        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({"error": {"code": "MISSING_BEARER_TOKEN", "message": "missing bearer token"}})
        );
    }

    #[tokio::test]
    async fn me_returns_the_verified_identity() {
        let token = issue_token(SECRET, "u1", "admin", Duration::from_secs(3600)).unwrap();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/v1/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"userId": "u1", "email": "", "name": "", "role": "admin"})
        );
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/me")
            .header(header::ORIGIN, "http://localhost:4200")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .body(Body::empty())
            .unwrap();

        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:4200"
        );
    }
}
