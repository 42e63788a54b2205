use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::Deserialize;
use serde_json::Value;

use crate::services::auth::{CredentialVerifier, Identity, VerifyError, role_claim};

/// Claims the gateway reads from an access token.
///
/// `exp` is enforced by `Validation`, so it does not need a field here.
/// `sub` and `role` stay untyped so a wrongly typed claim is a claims error,
/// not a corrupt token.
#[derive(Debug, Deserialize)]
struct GatewayClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    role: Option<Value>,
}

/// Verifies access tokens in-process with the shared signing key.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct LocalJwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for LocalJwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalJwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl LocalJwtVerifier {
    /// `secret` is the HMAC key for HS* algorithms and a PEM public key otherwise.
    pub fn new(
        secret: &str,
        algorithm: Algorithm,
        leeway_seconds: u64,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let decoding_key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                DecodingKey::from_secret(secret.as_bytes())
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(secret.as_bytes())?,
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(secret.as_bytes())?,
            _ => DecodingKey::from_ed_pem(secret.as_bytes())?,
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = leeway_seconds;
        // Tokens issued by the auth service carry no audience the gateway could pin.
        validation.validate_aud = false;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    fn classify(err: jsonwebtoken::errors::Error) -> VerifyError {
        match err.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => VerifyError::Malformed,
            ErrorKind::MissingRequiredClaim(claim) => {
                VerifyError::InvalidClaims(format!("missing required claim '{claim}'"))
            }
            _ => VerifyError::InvalidToken(err.to_string()),
        }
    }
}

#[async_trait]
impl CredentialVerifier for LocalJwtVerifier {
    fn strategy(&self) -> &'static str {
        "local"
    }

    async fn verify_token(&self, token: &str) -> Result<Identity, VerifyError> {
        let data = jsonwebtoken::decode::<GatewayClaims>(
            token.trim(),
            &self.decoding_key,
            &self.validation,
        )
        .map_err(Self::classify)?;

        let GatewayClaims { sub, role } = data.claims;
        let sub = match sub {
            Some(Value::String(s)) => s,
            None | Some(Value::Null) => {
                return Err(VerifyError::InvalidClaims("missing user_id".to_string()));
            }
            Some(_) => {
                return Err(VerifyError::InvalidClaims("subject must be a string".to_string()));
            }
        };
        let role = role_claim(role)?;

        Identity::new(sub, role)
            .ok_or_else(|| VerifyError::InvalidClaims("empty user_id".to_string()))
    }
}
