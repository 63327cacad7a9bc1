use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

use super::AuthCtx;

/// gate が request extensions に入れた `AuthCtx` を handler に渡す extractor
///
/// gate を通った request には必ず `AuthCtx` がある。
/// 無い場合は route の組み立てミス (gate 未適用) なので 500 で落とし、ログに残す。
/// 失敗時の body は他の失敗と同じ `{"error":{"code","message"}}` 形式。
pub struct AuthCtxExtractor(pub AuthCtx);

impl FromRequestParts<AppState> for AuthCtxExtractor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthCtx>() {
            Some(ctx) => Ok(AuthCtxExtractor(ctx.clone())),
            None => {
                tracing::error!(path = %parts.uri.path(), "AuthCtx missing: route is not behind the auth gate");
                Err(AppError::Internal)
            }
        }
    }
}
