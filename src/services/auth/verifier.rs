//! Common "credential verifier" capability shared by every gate.
//!
//! The gate middleware only knows this trait: it hands over the bearer string and gets
//! back either a `VerifiedIdentity` or a `VerifyError`. Which token scheme sits behind
//! it is decided once at startup (see `factory`).

use async_trait::async_trait;
use thiserror::Error;

/// Identity produced by a successful verification. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl VerifiedIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            name: None,
            role: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Bad signature, wrong algorithm, expired, revoked, malformed... all the same to callers.
    #[error("invalid or expired token: {0}")]
    Invalid(String),

    /// The identity provider could not be reached.
    #[error("verification service unavailable: {0}")]
    Unavailable(String),

    /// Verification succeeded but produced no subject. Upstream contract violation.
    #[error("verified token carries no subject")]
    MissingSubject,
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Short scheme name for logs ("firebase", "self_issued").
    fn scheme(&self) -> &'static str;

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError>;
}
