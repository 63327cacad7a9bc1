//! Firebase ID token verification (the production `IdTokenVerifier`).
//!
//! Checks performed, mirroring the Firebase Admin SDKs:
//! - header: `alg` == RS256, `kid` names one of Google's securetoken keys
//! - signature against that key (JWKS fetched over HTTPS, cached per `Cache-Control: max-age`)
//! - `iss` == `https://securetoken.google.com/<project_id>`, `aud` == `<project_id>`
//! - `exp` in the future, `iat` / `auth_time` not in the future (with clock skew)
//! - `sub` non-empty, at most 128 characters

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation,
    jwk::{Jwk, JwkSet},
};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::services::auth::external::{DecodedIdToken, IdTokenError, IdTokenVerifier};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const DEFAULT_KEYS_MAX_AGE: Duration = Duration::from_secs(60 * 60);
const MAX_SUBJECT_LEN: usize = 128;
// Bounds how long requests queue behind a key refresh (see `signing_key`).
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }

    fn find(&self, kid: &str) -> Result<Jwk, IdTokenError> {
        self.keys
            .find(kid)
            .cloned()
            .ok_or_else(|| IdTokenError::Invalid(format!("unknown kid: {kid}")))
    }
}

pub struct FirebaseTokenVerifier {
    project_id: String,
    jwks_url: Url,
    clock_skew_seconds: u64,
    validation: Validation,
    http: reqwest::Client,
    // Read-mostly: written only when the cached key set expires.
    keys: RwLock<Option<CachedKeys>>,
}

impl std::fmt::Debug for FirebaseTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseTokenVerifier")
            .field("project_id", &self.project_id)
            .field("jwks_url", &self.jwks_url.as_str())
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .finish()
    }
}

impl FirebaseTokenVerifier {
    pub fn new(
        project_id: impl Into<String>,
        jwks_url: Url,
        clock_skew_seconds: u64,
    ) -> Result<Self, IdTokenError> {
        let project_id = project_id.into();

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| IdTokenError::Unavailable(format!("http client: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{project_id}")]);
        validation.set_audience(&[project_id.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = clock_skew_seconds;

        Ok(Self {
            project_id,
            jwks_url,
            clock_skew_seconds,
            validation,
            http,
            keys: RwLock::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn signing_key(&self, kid: &str) -> Result<Jwk, IdTokenError> {
        {
            let cached = self.keys.read().await;
            if let Some(keys) = cached.as_ref().filter(|k| k.is_fresh()) {
                return keys.find(kid);
            }
        }

        // Single refresher: the write lock is held across the fetch, so concurrent
        // requests wait for one download instead of racing. Accepted trade-off: while a
        // refresh is in flight (at most HTTP_TIMEOUT, about once per max-age) every
        // verification waits on it.
        let mut cached = self.keys.write().await;
        if let Some(keys) = cached.as_ref().filter(|k| k.is_fresh()) {
            return keys.find(kid);
        }

        let fresh = self.fetch_keys().await?;
        let found = fresh.find(kid);
        *cached = Some(fresh);
        found
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, IdTokenError> {
        let response = self
            .http
            .get(self.jwks_url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IdTokenError::Unavailable(format!("fetch jwks: {e}")))?;

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEYS_MAX_AGE);

        let keys = response
            .json::<JwkSet>()
            .await
            .map_err(|e| IdTokenError::Unavailable(format!("decode jwks: {e}")))?;

        info!(
            keys = keys.keys.len(),
            max_age_secs = max_age.as_secs(),
            "refreshed identity provider signing keys"
        );

        Ok(CachedKeys {
            keys,
            expires_at: Instant::now() + max_age,
        })
    }

    fn check_claims(&self, claims: &Map<String, Value>) -> Result<String, IdTokenError> {
        let skew = i64::try_from(self.clock_skew_seconds).unwrap_or(i64::MAX);
        let latest_allowed = chrono::Utc::now().timestamp().saturating_add(skew);

        let iat = claims
            .get("iat")
            .and_then(Value::as_i64)
            .ok_or_else(|| IdTokenError::Invalid("missing 'iat' claim".to_string()))?;
        if iat > latest_allowed {
            return Err(IdTokenError::Invalid("token issued in the future".to_string()));
        }

        if let Some(auth_time) = claims.get("auth_time") {
            match auth_time.as_i64() {
                Some(t) if t <= latest_allowed => {}
                _ => return Err(IdTokenError::Invalid("invalid 'auth_time' claim".to_string())),
            }
        }

        let sub = claims.get("sub").and_then(Value::as_str).unwrap_or_default();
        if sub.is_empty() || sub.chars().count() > MAX_SUBJECT_LEN {
            return Err(IdTokenError::Invalid("invalid 'sub' claim".to_string()));
        }

        Ok(sub.to_string())
    }
}

#[async_trait]
impl IdTokenVerifier for FirebaseTokenVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<DecodedIdToken, IdTokenError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| IdTokenError::Invalid(format!("malformed header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdTokenError::Invalid(format!(
                "unexpected alg: {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdTokenError::Invalid("missing kid".to_string()))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| IdTokenError::Invalid(format!("unusable jwk: {e}")))?;

        let data = jsonwebtoken::decode::<Map<String, Value>>(token, &key, &self.validation)
            .map_err(|e| IdTokenError::Invalid(e.to_string()))?;

        let uid = self.check_claims(&data.claims)?;
        debug!(uid = %uid, "firebase id token verified");

        Ok(DecodedIdToken {
            uid,
            claims: data.claims,
        })
    }
}

/// `Cache-Control: public, max-age=19830, must-revalidate` -> 19830s.
fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
