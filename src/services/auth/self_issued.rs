//! Self-issued tokens: HS256 JWTs signed with the shared `JWT_SECRET`.
//!
//! - `SelfIssuedVerifier` is the gate-side verifier (`CredentialVerifier`).
//! - `TokenIssuer` / `issue_token` mint tokens. Not routed; used by the `issue-token` CLI.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::services::auth::verifier::{CredentialVerifier, VerifiedIdentity, VerifyError};

/// The only algorithm accepted or produced.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a self-issued token.
///
/// `iat`/`exp`/`nbf` are unix seconds. The issuer always sets `iat` and `exp`;
/// the verifier only enforces the ones that are present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelfIssuedClaims {
    pub uid: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("ttl must be positive")]
    NonPositiveTtl,
    #[error("ttl out of range")]
    TtlOutOfRange,
    #[error("empty subject")]
    EmptySubject,
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// HS256 verifier bound to one shared secret.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct SelfIssuedVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    leeway_seconds: i64,
}

impl fmt::Debug for SelfIssuedVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfIssuedVerifier")
            .field("validation", &self.validation)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl SelfIssuedVerifier {
    pub fn new(secret: &str, leeway_seconds: u64) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        // Validation::new pins `algorithms` to HS256 only, so any other alg
        // (HS384, RS256, "none", ...) fails before the signature is even looked at.
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        // exp is checked when present; uid is checked below.
        validation.required_spec_claims.clear();

        Self {
            decoding_key,
            validation,
            // Config caps the leeway well below this.
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Decode + validate a token into its raw claims.
    pub fn decode_claims(&self, token: &str) -> Result<SelfIssuedClaims, VerifyError> {
        let data =
            jsonwebtoken::decode::<SelfIssuedClaims>(token, &self.decoding_key, &self.validation)
                .map_err(|e| VerifyError::Invalid(e.to_string()))?;
        let claims = data.claims;

        // jsonwebtoken only rejects `exp < now - leeway`; a token is expired at `exp` itself.
        if let Some(exp) = claims.exp {
            let now = chrono::Utc::now().timestamp();
            if exp.saturating_add(self.leeway_seconds) <= now {
                return Err(VerifyError::Invalid("token expired".to_string()));
            }
        }
        if let (Some(iat), Some(exp)) = (claims.iat, claims.exp) {
            if exp <= iat {
                return Err(VerifyError::Invalid("exp is not after iat".to_string()));
            }
        }
        if claims.uid.trim().is_empty() {
            return Err(VerifyError::Invalid("empty 'uid' claim".to_string()));
        }

        Ok(claims)
    }

    /// Verify, then convert claims into the identity handed to handlers.
    pub fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let claims = self.decode_claims(token)?;

        let mut identity = VerifiedIdentity::new(claims.uid);
        // An empty role means "no elevated role", same as absent.
        identity.role = Some(claims.role).filter(|r| !r.is_empty());

        Ok(identity)
    }
}

#[async_trait]
impl CredentialVerifier for SelfIssuedVerifier {
    fn scheme(&self) -> &'static str {
        "self_issued"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.verify_token(token)
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `uid`/`role` valid for `ttl` from now.
    pub fn issue(&self, uid: &str, role: &str, ttl: Duration) -> Result<String, IssueError> {
        if uid.trim().is_empty() {
            return Err(IssueError::EmptySubject);
        }
        if ttl.is_zero() {
            return Err(IssueError::NonPositiveTtl);
        }
        let ttl = i64::try_from(ttl.as_secs()).map_err(|_| IssueError::TtlOutOfRange)?;
        // Sub-second ttls would round down to exp == iat.
        if ttl == 0 {
            return Err(IssueError::NonPositiveTtl);
        }

        let now = chrono::Utc::now().timestamp();
        let exp = now.checked_add(ttl).ok_or(IssueError::TtlOutOfRange)?;

        let claims = SelfIssuedClaims {
            uid: uid.to_string(),
            role: role.to_string(),
            iat: Some(now),
            exp: Some(exp),
            nbf: None,
        };

        self.sign(&claims)
    }

    pub fn sign(&self, claims: &SelfIssuedClaims) -> Result<String, IssueError> {
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            IssueError::Sign(e)
        })
    }
}

/// One-shot helper: sign a token with `secret` without keeping an issuer around.
pub fn issue_token(secret: &str, uid: &str, role: &str, ttl: Duration) -> Result<String, IssueError> {
    TokenIssuer::new(secret).issue(uid, role, ttl)
}
