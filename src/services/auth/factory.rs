/// Factory: build the request gate's `CredentialVerifier` from application `Config`.
use std::sync::Arc;

use tracing::error;

use crate::config::{Config, GateKind};
use crate::error::AppError;
use crate::services::auth::{
    CredentialVerifier, ExternalIdentityVerifier, FirebaseTokenVerifier, SelfIssuedVerifier,
};

pub fn build_verifier(config: &Config) -> Result<Arc<dyn CredentialVerifier>, AppError> {
    match config.gate {
        GateKind::SelfIssued => Ok(Arc::new(SelfIssuedVerifier::new(
            &config.jwt_secret,
            config.token_leeway_seconds,
        ))),
        GateKind::Firebase => {
            let firebase = config.firebase.as_ref().ok_or_else(|| {
                error!("firebase gate selected without firebase configuration");
                AppError::Internal
            })?;

            let provider = FirebaseTokenVerifier::new(
                firebase.project_id.clone(),
                firebase.jwks_url.clone(),
                firebase.clock_skew_seconds,
            )
            .map_err(|e| {
                error!(error = %e, "failed to build firebase token verifier");
                AppError::Internal
            })?;

            Ok(Arc::new(ExternalIdentityVerifier::new(Arc::new(provider))))
        }
    }
}
