/*
 * Responsibility
 * - GET /me の response DTO
 * - フロントエンドは camelCase (userId) で受け取る
 */
use serde::Serialize;

use crate::api::v1::extractors::AuthCtx;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    // Absent profile claims are reported as "" (clients never see null here).
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl From<AuthCtx> for MeResponse {
    fn from(ctx: AuthCtx) -> Self {
        Self {
            user_id: ctx.user_id,
            email: ctx.email.unwrap_or_default(),
            name: ctx.name.unwrap_or_default(),
            role: ctx.role,
        }
    }
}
