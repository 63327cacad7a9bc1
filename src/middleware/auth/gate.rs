//! Bearer token 検証 gate → AuthCtx を extensions に入れる
//!
//! - `Authorization` ヘッダから bearer を抽出 (無ければ verifier を呼ばずに 401)
//! - `state.verifier` (Firebase / self-issued のどちらか) で検証
//! - 成功時は `AuthCtx` を request extensions に格納して次へ
//!
//! 失敗理由の詳細はログにだけ残し、クライアントには
//! "missing bearer token" / "invalid or expired token" しか返さない。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::middleware::auth::bearer::extract_bearer;
use crate::services::auth::VerifyError;
use crate::state::AppState;

/// `/api/v1/*` に認証を掛けるための middleware を適用する。
///
/// 例：
/// ```ignore
/// let v1 = Router::new().route("/me", get(me));
/// let v1 = middleware::auth::gate::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, gate_middleware))
}

async fn gate_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(token) = extract_bearer(header).map(str::to_owned) else {
        tracing::debug!(path = %req.uri().path(), "missing bearer token");
        return Err(AppError::MissingBearerToken);
    };

    let identity = match state.verifier.verify(&token).await {
        Ok(identity) => identity,
        Err(err @ VerifyError::MissingSubject) => {
            tracing::error!(scheme = state.verifier.scheme(), error = %err, "verified token has no subject");
            return Err(rejection(&err, state.idp_unavailable_as_503));
        }
        Err(err) => {
            tracing::warn!(
                scheme = state.verifier.scheme(),
                error = %err,
                "credential verification failed"
            );
            return Err(rejection(&err, state.idp_unavailable_as_503));
        }
    };

    tracing::debug!(
        scheme = state.verifier.scheme(),
        user_id = %identity.subject,
        "request authenticated"
    );

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(AuthCtx::from(identity));

    Ok(next.run(req).await)
}

fn rejection(err: &VerifyError, unavailable_as_503: bool) -> AppError {
    match err {
        VerifyError::Invalid(_) => AppError::InvalidToken,
        VerifyError::Unavailable(_) if unavailable_as_503 => AppError::IdentityProviderUnavailable,
        VerifyError::Unavailable(_) => AppError::InvalidToken,
        VerifyError::MissingSubject => AppError::Internal,
    }
}
