/*
 * Responsibility
 * - GET /api/v1/me: gate が載せた AuthCtx をそのまま返す
 */
use axum::Json;

use crate::api::v1::dto::me::MeResponse;
use crate::api::v1::extractors::AuthCtxExtractor;

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<MeResponse> {
    Json(MeResponse::from(ctx))
}
