/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - トークン検証 (Firebase / self-issued) は middleware/services 側の責務
 * - ここは「型（契約）」として固定化する
 */

use crate::services::auth::VerifiedIdentity;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_id` は検証済みトークンの subject (Firebase uid / self-issued `uid`)
/// - `email` / `name` は外部 IdP のプロフィール claim (無い・文字列でない場合は None)
/// - `role` は単一のフラットな role 文字列。None は「昇格権限なし」でありエラーではない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl AuthCtx {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

impl From<VerifiedIdentity> for AuthCtx {
    fn from(identity: VerifiedIdentity) -> Self {
        Self {
            user_id: identity.subject,
            email: identity.email,
            name: identity.name,
            role: identity.role,
        }
    }
}
