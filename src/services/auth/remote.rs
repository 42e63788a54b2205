//! Delegates token validation to the auth service.
//!
//! The gateway sends `Authorization: Bearer <token>` to the validation endpoint
//! and trusts the identity it answers with. A transport failure is reported as
//! `AuthServiceUnavailable` so callers get a 503 instead of a misleading 401.
use async_trait::async_trait;
use axum::http::header;
use serde::Deserialize;
use serde_json::Value;

use crate::services::auth::{CredentialVerifier, Identity, VerifyError, role_claim};

/// Body of a successful validation response.
///
/// `user_id` may arrive as `sub`, and as a string or a number.
#[derive(Debug, Deserialize)]
struct ValidationResponse {
    #[serde(default, alias = "sub")]
    user_id: Option<Value>,
    #[serde(default)]
    role: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RemoteVerifier {
    client: reqwest::Client,
    validate_url: String,
}

impl RemoteVerifier {
    /// `client` is the shared pooled client; cloning it shares the pool.
    pub fn new(client: reqwest::Client, auth_base_url: &str, validate_path: &str) -> Self {
        Self {
            client,
            validate_url: format!("{}{}", auth_base_url.trim_end_matches('/'), validate_path),
        }
    }

    pub fn validate_url(&self) -> &str {
        &self.validate_url
    }
}

#[async_trait]
impl CredentialVerifier for RemoteVerifier {
    fn strategy(&self) -> &'static str {
        "remote"
    }

    async fn verify_token(&self, token: &str) -> Result<Identity, VerifyError> {
        let response = self
            .client
            .get(&self.validate_url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| VerifyError::AuthServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "auth service rejected token");
            return Err(VerifyError::InvalidToken(format!(
                "auth service answered {status}"
            )));
        }

        let body: ValidationResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::InvalidToken(format!("unreadable validation response: {e}")))?;

        let user_id = match body.user_id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(VerifyError::InvalidClaims("missing user_id".to_string())),
        };

        let role = role_claim(body.role)?;

        Identity::new(user_id, role)
            .ok_or_else(|| VerifyError::InvalidClaims("empty user_id".to_string()))
    }
}
