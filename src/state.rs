/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - verifier: 起動時に 1 度だけ作る CredentialVerifier (リクエスト毎には変更しない)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::CredentialVerifier;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn CredentialVerifier>,
    // Identity provider outage: 503 instead of the default 401.
    pub idp_unavailable_as_503: bool,
}

impl AppState {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, idp_unavailable_as_503: bool) -> Self {
        Self {
            verifier,
            idp_unavailable_as_503,
        }
    }
}
