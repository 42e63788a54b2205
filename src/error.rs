/*
 * Responsibility
 * - gateway 共通の AppError 定義 (クライアントに見えるエラー分類)
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - upstream が返したエラーは status と body をそのまま中継する
 */
use axum::{
    Json,
    body::Bytes,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::services::auth::VerifyError;
use crate::services::proxy::Upstream;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Body an upstream attached to an error status, relayed byte for byte.
#[derive(Debug, Clone)]
pub struct UpstreamBody {
    pub content_type: Option<HeaderValue>,
    pub bytes: Bytes,
}

impl UpstreamBody {
    /// The body as JSON when it parses, otherwise as text. Used for diagnostics.
    pub fn detail(&self) -> Value {
        serde_json::from_slice(&self.bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.bytes).into_owned()))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Credential(#[from] VerifyError),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("no route for {path}")]
    NoRoute { path: String },

    #[error("method {method} is not allowed on this route")]
    MethodNotAllowed { method: Method, allowed: Vec<Method> },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("{} Service is unavailable", .upstream.display_name())]
    ServiceUnavailable { upstream: Upstream },

    /// The upstream answered with 4xx/5xx; relayed verbatim.
    #[error("{upstream} answered {status}")]
    Upstream {
        upstream: Upstream,
        status: StatusCode,
        body: UpstreamBody,
    },

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn no_route(path: impl Into<String>) -> Self {
        Self::NoRoute { path: path.into() }
    }

    /// Status the client will see.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Credential(VerifyError::AuthServiceUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Credential(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NoRoute { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { status, .. } => *status,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Credential(e) => match e {
                VerifyError::MissingCredential => "MISSING_CREDENTIAL",
                VerifyError::MalformedCredential(_) => "MALFORMED_CREDENTIAL",
                VerifyError::Expired => "TOKEN_EXPIRED",
                VerifyError::Malformed => "MALFORMED_TOKEN",
                VerifyError::InvalidClaims(_) => "INVALID_CLAIMS",
                VerifyError::InvalidToken(_) => "INVALID_TOKEN",
                VerifyError::AuthServiceUnavailable(_) => "AUTH_SERVICE_UNAVAILABLE",
            },
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NoRoute { .. } => "NO_ROUTE",
            AppError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::Internal => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, extra_header) = match self {
            AppError::Upstream { body, .. } => {
                let mut res = (status, body.bytes).into_response();
                match body.content_type {
                    Some(content_type) => {
                        res.headers_mut().insert(header::CONTENT_TYPE, content_type);
                    }
                    None => {
                        res.headers_mut().remove(header::CONTENT_TYPE);
                    }
                }
                return res;
            }
            AppError::MethodNotAllowed { ref allowed, .. } => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                let allow = HeaderValue::from_str(&allow).ok().map(|v| (header::ALLOW, v));
                (self.to_string(), allow)
            }
            ref e if status == StatusCode::UNAUTHORIZED => (
                e.to_string(),
                Some((header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))),
            ),
            ref e => (e.to_string(), None),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
            },
        };

        let mut res = (status, Json(body)).into_response();
        if let Some((name, value)) = extra_header {
            res.headers_mut().insert(name, value);
        }
        res
    }
}
