//! External-identity gate: tokens issued and verified by a third-party identity provider.
//!
//! Two layers:
//! - `IdTokenVerifier` is the provider's own verification call (Firebase in production,
//!   a stub in tests). It owns signature/expiry/issuer/audience checks.
//! - `ExternalIdentityVerifier` turns the provider's open claim map into a
//!   `VerifiedIdentity` using typed lookups only.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::services::auth::verifier::{CredentialVerifier, VerifiedIdentity, VerifyError};

/// Claim set returned by a successful provider verification.
#[derive(Debug, Clone, Default)]
pub struct DecodedIdToken {
    pub uid: String,
    pub claims: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum IdTokenError {
    #[error("id token rejected: {0}")]
    Invalid(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<DecodedIdToken, IdTokenError>;
}

pub struct ExternalIdentityVerifier {
    provider: Arc<dyn IdTokenVerifier>,
}

impl ExternalIdentityVerifier {
    pub fn new(provider: Arc<dyn IdTokenVerifier>) -> Self {
        Self { provider }
    }

    fn identity_from(decoded: DecodedIdToken) -> Result<VerifiedIdentity, VerifyError> {
        if decoded.uid.trim().is_empty() {
            error!("identity provider accepted a token without a subject");
            return Err(VerifyError::MissingSubject);
        }

        Ok(VerifiedIdentity {
            email: string_claim(&decoded.claims, "email"),
            name: string_claim(&decoded.claims, "name"),
            role: string_claim(&decoded.claims, "role"),
            subject: decoded.uid,
        })
    }
}

#[async_trait]
impl CredentialVerifier for ExternalIdentityVerifier {
    fn scheme(&self) -> &'static str {
        "firebase"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let decoded = self
            .provider
            .verify_id_token(token)
            .await
            .map_err(|err| match err {
                IdTokenError::Invalid(reason) => VerifyError::Invalid(reason),
                IdTokenError::Unavailable(reason) => VerifyError::Unavailable(reason),
            })?;

        debug!(uid = %decoded.uid, claims = decoded.claims.len(), "id token verified");
        Self::identity_from(decoded)
    }
}

/// Typed claim lookup: `Some` only for a present, string-typed value.
///
/// A present but non-string value is an upstream data fault; it degrades to "absent".
pub fn string_claim(claims: &Map<String, Value>, key: &str) -> Option<String> {
    match claims.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => {
            warn!(claim = key, kind = value_kind(other), "ignoring non-string claim");
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    struct StubProvider {
        result: fn() -> Result<DecodedIdToken, IdTokenError>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(result: fn() -> Result<DecodedIdToken, IdTokenError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IdTokenVerifier for StubProvider {
        async fn verify_id_token(&self, _token: &str) -> Result<DecodedIdToken, IdTokenError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn decoded(claims: Value) -> DecodedIdToken {
        let Value::Object(claims) = claims else {
            panic!("claims must be an object");
        };
        DecodedIdToken {
            uid: "firebase-uid-1".to_string(),
            claims,
        }
    }

    #[tokio::test]
    async fn extracts_profile_claims() {
        let provider = StubProvider::new(|| {
            Ok(decoded(json!({
                "email": "alex@example.com",
                "name": "Alex",
                "role": "tutor",
            })))
        });
        let sut = ExternalIdentityVerifier::new(provider);

        let identity = sut.verify("token").await.unwrap();

        assert_eq!(
            identity,
            VerifiedIdentity {
                subject: "firebase-uid-1".to_string(),
                email: Some("alex@example.com".to_string()),
                name: Some("Alex".to_string()),
                role: Some("tutor".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn missing_role_leaves_role_unset() {
        let provider = StubProvider::new(|| Ok(decoded(json!({"email": "alex@example.com"}))));
        let sut = ExternalIdentityVerifier::new(provider);

        let identity = sut.verify("token").await.unwrap();

        assert_eq!(identity.role, None);
        assert_eq!(identity.name, None);
        assert_eq!(identity.email.as_deref(), Some("alex@example.com"));
    }

    #[tokio::test]
    async fn non_string_claims_degrade_to_absent() {
        let provider = StubProvider::new(|| {
            Ok(decoded(json!({
                "email": 42,
                "name": {"first": "Alex"},
                "role": ["admin"],
            })))
        });
        let sut = ExternalIdentityVerifier::new(provider);

        let identity = sut.verify("token").await.unwrap();

        assert_eq!(identity, VerifiedIdentity::new("firebase-uid-1"));
    }

    #[tokio::test]
    async fn provider_rejection_is_invalid() {
        let provider =
            StubProvider::new(|| Err(IdTokenError::Invalid("token expired".to_string())));
        let sut = ExternalIdentityVerifier::new(provider.clone());

        let err = sut.verify("token").await.unwrap_err();

        assert!(matches!(err, VerifyError::Invalid(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_outage_is_unavailable() {
        let provider =
            StubProvider::new(|| Err(IdTokenError::Unavailable("connect timeout".to_string())));
        let sut = ExternalIdentityVerifier::new(provider);

        let err = sut.verify("token").await.unwrap_err();

        assert!(matches!(err, VerifyError::Unavailable(_)));
    }

    #[tokio::test]
    async fn empty_subject_is_an_internal_fault() {
        let provider = StubProvider::new(|| Ok(DecodedIdToken::default()));
        let sut = ExternalIdentityVerifier::new(provider);

        let err = sut.verify("token").await.unwrap_err();

        assert!(matches!(err, VerifyError::MissingSubject));
    }

    #[tokio::test]
    async fn verifying_twice_yields_same_identity() {
        let provider = StubProvider::new(|| Ok(decoded(json!({"name": "Alex"}))));
        let sut = ExternalIdentityVerifier::new(provider.clone());

        let first = sut.verify("token").await.unwrap();
        let second = sut.verify("token").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn null_claim_is_absent() {
        let Value::Object(claims) = json!({"email": null}) else {
            unreachable!()
        };

        assert_eq!(string_claim(&claims, "email"), None);
        assert_eq!(string_claim(&claims, "missing"), None);
    }
}
