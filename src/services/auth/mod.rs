pub mod factory;
pub mod identity;
pub mod local_jwt;
pub mod remote;
pub mod verifier;

pub use factory::build_verifier;
pub use identity::{Identity, role_claim};
pub use local_jwt::LocalJwtVerifier;
pub use remote::RemoteVerifier;
pub use verifier::{CredentialVerifier, VerifyError};
