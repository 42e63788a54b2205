//! Credential verification contract shared by the local and remote strategies.
use std::fmt;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use thiserror::Error;

use crate::services::auth::Identity;

/// Why a credential was rejected.
///
/// Everything except `AuthServiceUnavailable` is the caller's fault (401);
/// `AuthServiceUnavailable` means the gateway could not get an answer (503).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("missing Authorization header")]
    MissingCredential,

    #[error("{0}")]
    MalformedCredential(&'static str),

    #[error("token has expired")]
    Expired,

    #[error("invalid token format; token may be corrupted or incomplete")]
    Malformed,

    #[error("invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("token validation failed: {0}")]
    InvalidToken(String),

    #[error("auth service is unavailable: {0}")]
    AuthServiceUnavailable(String),
}

impl VerifyError {
    /// Stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential(_) => "malformed_credential",
            Self::Expired => "expired",
            Self::Malformed => "malformed",
            Self::InvalidClaims(_) => "invalid_claims",
            Self::InvalidToken(_) => "invalid_token",
            Self::AuthServiceUnavailable(_) => "auth_service_unavailable",
        }
    }
}

/// A way of turning a bearer token into an [`Identity`].
///
/// Exactly one implementation is active per process, chosen from `Config` at startup.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + fmt::Debug {
    /// Strategy name for logs (`local`, `remote`).
    fn strategy(&self) -> &'static str;

    /// Validate the bare token (without the `Bearer` scheme).
    async fn verify_token(&self, token: &str) -> Result<Identity, VerifyError>;

    /// Validate the raw `Authorization` header value.
    async fn verify(&self, raw_header: Option<&str>) -> Result<Identity, VerifyError> {
        let raw = raw_header.ok_or(VerifyError::MissingCredential)?;
        let token = parse_bearer(raw)?;
        self.verify_token(token).await
    }
}

/// Read the `Authorization` header as text.
///
/// Absent is `Ok(None)`; a value that is not visible ASCII is malformed.
pub fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, VerifyError> {
    headers
        .get(header::AUTHORIZATION)
        .map(|v| {
            v.to_str().map_err(|_| {
                VerifyError::MalformedCredential("invalid Authorization header format")
            })
        })
        .transpose()
}

/// Split `"<scheme> <token>"` and require the `bearer` scheme (any case).
pub fn parse_bearer(raw: &str) -> Result<&str, VerifyError> {
    let mut parts = raw.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => {
            if scheme.eq_ignore_ascii_case("bearer") {
                Ok(token)
            } else {
                Err(VerifyError::MalformedCredential(
                    "invalid authentication scheme",
                ))
            }
        }
        _ => Err(VerifyError::MalformedCredential(
            "invalid Authorization header format",
        )),
    }
}
