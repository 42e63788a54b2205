/*
 * Responsibility
 * - 検証済みクレデンシャルから得られる「呼び出し元」の型
 * - verifier が生成し、access middleware が request extensions に格納する
 * - forwarder はこの型だけを見て X-User-ID / X-User-Role を付与する
 */
use serde_json::Value;

use crate::services::auth::VerifyError;

/// Verified caller of a protected route.
///
/// `user_id` is never empty: a credential without a subject does not produce an
/// `Identity` at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    role: Option<String>,
}

impl Identity {
    /// Returns `None` when `user_id` is blank.
    pub fn new(user_id: impl Into<String>, role: Option<String>) -> Option<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return None;
        }

        Some(Self {
            user_id,
            role: role.filter(|r| !r.trim().is_empty()),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

/// Normalize a `role` claim: scalars become their text form, `null` is absent.
///
/// Arrays and objects have no single role and are rejected.
pub fn role_claim(value: Option<Value>) -> Result<Option<String>, VerifyError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(VerifyError::InvalidClaims(
            "role must be a single value".to_string(),
        )),
    }
}
