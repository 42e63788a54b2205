/// Factory: build the configured `CredentialVerifier` from application `Config`.
use std::sync::Arc;

use crate::config::{Config, ConfigError, VerifierMode};
use crate::services::auth::{CredentialVerifier, LocalJwtVerifier, RemoteVerifier};
use crate::services::proxy::Upstream;

pub fn build_verifier(
    config: &Config,
    client: &reqwest::Client,
) -> Result<Arc<dyn CredentialVerifier>, ConfigError> {
    let verifier: Arc<dyn CredentialVerifier> = match config.verifier {
        VerifierMode::Local => {
            let local = LocalJwtVerifier::new(
                &config.jwt_secret,
                config.jwt_algorithm,
                config.jwt_leeway_seconds,
            )
            .map_err(|e| {
                tracing::error!(error = %e, algorithm = ?config.jwt_algorithm, "unusable SECRET_KEY");
                ConfigError::Invalid("SECRET_KEY")
            })?;
            Arc::new(local)
        }
        VerifierMode::Remote => {
            let remote = RemoteVerifier::new(
                client.clone(),
                config.upstreams.get(Upstream::Auth),
                &config.auth_validate_path,
            );
            tracing::info!(url = remote.validate_url(), "credentials validated by auth service");
            Arc::new(remote)
        }
    };

    Ok(verifier)
}
