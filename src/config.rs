/*
 * Responsibility
 * - 環境変数や設定の読み込み (upstream URL, JWT 設定, CORS 許可など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::services::proxy::Upstream;

/// Used only outside production when `SECRET_KEY` is not set.
const DEV_SECRET_KEY: &str = "campus360-super-secret-key-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("invalid upstream url in {key}: {reason}")]
    InvalidUrl { key: &'static str, reason: String },
}

/// How bearer credentials are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierMode {
    /// Decode and validate the JWT in-process with the shared secret.
    Local,
    /// Ask the auth service to validate the token.
    Remote,
}

impl FromStr for VerifierMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "jwt" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::Invalid("AUTH_VERIFIER")),
        }
    }
}

/// Base URL per upstream service, without trailing slash.
#[derive(Debug, Clone)]
pub struct UpstreamUrls {
    urls: HashMap<Upstream, String>,
}

impl UpstreamUrls {
    pub fn get(&self, upstream: Upstream) -> &str {
        self.urls
            .get(&upstream)
            .map(String::as_str)
            .unwrap_or_else(|| upstream.default_url())
    }

    pub fn with(mut self, upstream: Upstream, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.urls
            .insert(upstream, base_url.trim_end_matches('/').to_string());
        self
    }
}

impl Default for UpstreamUrls {
    fn default() -> Self {
        let urls = Upstream::ALL
            .into_iter()
            .map(|u| (u, u.default_url().to_string()))
            .collect();
        Self { urls }
    }
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub upstreams: UpstreamUrls,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,

    pub verifier: VerifierMode,
    // HMAC secret, or a PEM public key for asymmetric algorithms
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub jwt_leeway_seconds: u64,
    pub auth_validate_path: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("upstreams", &self.upstreams)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("verifier", &self.verifier)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 8000,
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let mut upstreams = UpstreamUrls::default();
        for upstream in Upstream::ALL {
            if let Some(raw) = lookup(upstream.env_key()) {
                let base_url = parse_base_url(upstream.env_key(), &raw)?;
                upstreams = upstreams.with(upstream, base_url);
            }
        }

        let upstream_timeout_secs: u64 = parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 30)?;
        if upstream_timeout_secs == 0 {
            return Err(ConfigError::Invalid("UPSTREAM_TIMEOUT_SECS"));
        }

        let max_body_bytes: usize = parse_or(&lookup, "MAX_BODY_BYTES", 10 * 1024 * 1024)?;

        let verifier = match lookup("AUTH_VERIFIER") {
            Some(raw) => raw.parse()?,
            None => VerifierMode::Local,
        };

        let jwt_secret = match lookup("SECRET_KEY") {
            Some(secret) if !secret.trim().is_empty() => secret.replace("\\n", "\n"),
            // The production gateway must never fall back to the well-known dev secret.
            _ if app_env.is_production() && verifier == VerifierMode::Local => {
                return Err(ConfigError::Missing("SECRET_KEY"));
            }
            _ => DEV_SECRET_KEY.to_string(),
        };

        let jwt_algorithm = match lookup("ALGORITHM") {
            Some(raw) => Algorithm::from_str(raw.trim())
                .map_err(|_| ConfigError::Invalid("ALGORITHM"))?,
            None => Algorithm::HS256,
        };

        let jwt_leeway_seconds: u64 = parse_or(&lookup, "JWT_LEEWAY_SECONDS", 0)?;

        let auth_validate_path = lookup("AUTH_VALIDATE_PATH")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "/auth/validate".to_string());
        if !auth_validate_path.starts_with('/') {
            return Err(ConfigError::Invalid("AUTH_VALIDATE_PATH"));
        }

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            upstreams,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            max_body_bytes,
            verifier,
            jwt_secret,
            jwt_algorithm,
            jwt_leeway_seconds,
            auth_validate_path,
        })
    }

    /// Whole-request budget: the upstream call plus headroom for auth and body buffering.
    pub fn request_timeout(&self) -> Duration {
        self.upstream_timeout + Duration::from_secs(5)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_base_url(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        key,
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            key,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidUrl {
            key,
            reason: "base url must not carry a query or fragment".to_string(),
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}
