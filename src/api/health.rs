/*
 * Responsibility
 * - GET /healthz (疎通用, 認証なし)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    (StatusCode::OK, Json(json!({"ok": true, "ts": ts})))
}
