/*
 * Responsibility
 * - 環境変数や設定の読み込み (BACKEND_PORT, CORS 許可、Auth gate 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";
pub const GOOGLE_SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
/// Upper bound for any clock tolerance (token leeway, Firebase clock skew).
pub const MAX_CLOCK_TOLERANCE_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Which token scheme guards `/api/v1/*`. Exactly one is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    Firebase,
    SelfIssued,
}

impl FromStr for GateKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "self_issued" | "self-issued" | "jwt" => Ok(Self::SelfIssued),
            _ => Err(ConfigError::Invalid("AUTH_GATE")),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub jwks_url: Url,
    pub clock_skew_seconds: u64,
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub gate: GateKind,
    pub idp_unavailable_as_503: bool,

    // Shared HS256 secret for self-issued tokens.
    pub jwt_secret: String,
    pub token_leeway_seconds: u64,

    // Only present when `gate == GateKind::Firebase`.
    pub firebase: Option<FirebaseConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the shared secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("gate", &self.gate)
            .field("idp_unavailable_as_503", &self.idp_unavailable_as_503)
            .field("token_leeway_seconds", &self.token_leeway_seconds)
            .field("firebase", &self.firebase)
            .finish()
    }
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    project_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Build the config from an arbitrary variable source (env in production, a map in tests).
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Accept both "8080" and the ":8080" form used by older deployments.
        let port: u16 = match var("BACKEND_PORT") {
            Some(raw) => raw
                .trim()
                .trim_start_matches(':')
                .parse()
                .map_err(|_| ConfigError::Invalid("BACKEND_PORT"))?,
            None => 8080,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("BACKEND_PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:4200".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let gate = match var("AUTH_GATE") {
            Some(raw) => raw.parse::<GateKind>()?,
            None => GateKind::Firebase,
        };

        let idp_unavailable_as_503 = match var("IDP_UNAVAILABLE_AS_503") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid("IDP_UNAVAILABLE_AS_503"))?,
            None => false,
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) if secret.trim().is_empty() => {
                return Err(ConfigError::Invalid("JWT_SECRET"));
            }
            Some(secret) => secret,
            // The development fallback must never guard a production deployment.
            None if app_env.is_production() && gate == GateKind::SelfIssued => {
                return Err(ConfigError::Missing("JWT_SECRET"));
            }
            None => DEV_JWT_SECRET.to_string(),
        };

        let token_leeway_seconds = parse_seconds(&var, "TOKEN_LEEWAY_SECONDS", 0)?;

        let firebase = match gate {
            GateKind::Firebase => Some(Self::firebase_from_vars(&var)?),
            GateKind::SelfIssued => None,
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            gate,
            idp_unavailable_as_503,
            jwt_secret,
            token_leeway_seconds,
            firebase,
        })
    }

    fn firebase_from_vars<F>(var: &F) -> Result<FirebaseConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_id = match var("FIREBASE_PROJECT_ID") {
            Some(id) => id,
            None => {
                let path = var("FIREBASE_SERVICE_ACCOUNT_FILE")
                    .unwrap_or_else(|| "./serviceAccountKey.json".to_string());
                read_project_id(Path::new(&path))?
            }
        };

        if project_id.trim().is_empty() {
            return Err(ConfigError::Invalid("FIREBASE_PROJECT_ID"));
        }

        let jwks_url = var("FIREBASE_JWKS_URL")
            .unwrap_or_else(|| GOOGLE_SECURETOKEN_JWKS_URL.to_string());
        let jwks_url = Url::parse(&jwks_url).map_err(|_| ConfigError::Invalid("FIREBASE_JWKS_URL"))?;

        // Firebase Admin SDKs tolerate 5 minutes of clock skew.
        let clock_skew_seconds = parse_seconds(var, "FIREBASE_CLOCK_SKEW_SECONDS", 300)?;

        Ok(FirebaseConfig {
            project_id,
            jwks_url,
            clock_skew_seconds,
        })
    }
}

fn read_project_id(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?;
    let key: ServiceAccountKey = serde_json::from_str(&raw)
        .map_err(|_| ConfigError::Invalid("FIREBASE_SERVICE_ACCOUNT_FILE"))?;
    Ok(key.project_id)
}

/// Clock tolerances: unparsable or larger than `MAX_CLOCK_TOLERANCE_SECONDS` fails startup.
fn parse_seconds<F>(var: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs <= MAX_CLOCK_TOLERANCE_SECONDS)
        .ok_or(ConfigError::Invalid(key))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn self_issued_defaults_in_development() {
        let config = Config::from_vars(vars(&[("AUTH_GATE", "self_issued")])).unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.gate, GateKind::SelfIssued);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.cors_allowed_origins, vec!["http://localhost:4200"]);
        assert_eq!(config.token_leeway_seconds, 0);
        assert!(!config.idp_unavailable_as_503);
        assert!(config.firebase.is_none());
    }

    #[test]
    fn port_accepts_colon_prefixed_form() {
        let config = Config::from_vars(vars(&[
            ("AUTH_GATE", "self_issued"),
            ("BACKEND_PORT", ":9090"),
        ]))
        .unwrap();

        assert_eq!(config.addr.port(), 9090);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Config::from_vars(vars(&[
            ("AUTH_GATE", "self_issued"),
            ("BACKEND_PORT", "http"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid("BACKEND_PORT")));
    }

    #[test]
    fn production_self_issued_requires_secret() {
        let err = Config::from_vars(vars(&[
            ("AUTH_GATE", "self_issued"),
            ("APP_ENV", "production"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn firebase_gate_reads_project_settings() {
        let config = Config::from_vars(vars(&[
            ("FIREBASE_PROJECT_ID", "astar-demo"),
            ("IDP_UNAVAILABLE_AS_503", "true"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:4200, https://app.example.com,"),
        ]))
        .unwrap();

        let firebase = config.firebase.unwrap();
        assert_eq!(config.gate, GateKind::Firebase);
        assert_eq!(firebase.project_id, "astar-demo");
        assert_eq!(firebase.jwks_url.as_str(), GOOGLE_SECURETOKEN_JWKS_URL);
        assert_eq!(firebase.clock_skew_seconds, 300);
        assert!(config.idp_unavailable_as_503);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:4200", "https://app.example.com"]
        );
    }

    #[test]
    fn firebase_gate_without_project_fails() {
        let err = Config::from_vars(vars(&[(
            "FIREBASE_SERVICE_ACCOUNT_FILE",
            "/nonexistent/serviceAccountKey.json",
        )]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Missing("FIREBASE_PROJECT_ID")));
    }

    #[test]
    fn unparsable_token_leeway_is_rejected() {
        let err = Config::from_vars(vars(&[
            ("AUTH_GATE", "self_issued"),
            ("TOKEN_LEEWAY_SECONDS", "sixty"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid("TOKEN_LEEWAY_SECONDS")));
    }

    #[test]
    fn token_leeway_is_bounded() {
        let config = Config::from_vars(vars(&[
            ("AUTH_GATE", "self_issued"),
            ("TOKEN_LEEWAY_SECONDS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.token_leeway_seconds, 30);

        let err = Config::from_vars(vars(&[
            ("AUTH_GATE", "self_issued"),
            ("TOKEN_LEEWAY_SECONDS", "18446744073709551615"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("TOKEN_LEEWAY_SECONDS")));
    }

    #[test]
    fn invalid_firebase_clock_skew_is_rejected() {
        for raw in ["5m", "-1", "3601"] {
            let err = Config::from_vars(vars(&[
                ("FIREBASE_PROJECT_ID", "astar-demo"),
                ("FIREBASE_CLOCK_SKEW_SECONDS", raw),
            ]))
            .unwrap_err();

            assert!(
                matches!(err, ConfigError::Invalid("FIREBASE_CLOCK_SKEW_SECONDS")),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_gate_is_rejected() {
        let err = Config::from_vars(vars(&[("AUTH_GATE", "saml")])).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid("AUTH_GATE")));
    }
}
