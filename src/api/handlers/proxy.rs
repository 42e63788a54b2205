/*
 * Responsibility
 * - route table に載っている全 prefix 共通の転送 handler
 * - body を全量読み込んで ProxiedRequest を作り、Forwarder に渡す
 * - 認証・route 解決は middleware::auth::access 側の責務
 */
use std::error::Error as StdError;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    response::Response,
};
use http_body_util::LengthLimitError;

use crate::api::extractors::{Caller, Routed};
use crate::error::AppError;
use crate::services::proxy::ProxiedRequest;
use crate::state::AppState;

pub async fn forward(
    State(state): State<AppState>,
    Routed(target): Routed,
    Caller(identity): Caller,
    req: Request<Body>,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();

    let body = to_bytes(body, state.max_body_bytes).await.map_err(|e| {
        if is_length_limit(&e) {
            AppError::PayloadTooLarge {
                limit: state.max_body_bytes,
            }
        } else {
            tracing::warn!(error = %e, "failed to read request body");
            AppError::BadRequest("failed to read request body")
        }
    })?;

    let request = ProxiedRequest {
        method: parts.method,
        headers: parts.headers,
        body,
        query: parts.uri.query().map(str::to_owned),
    };

    state
        .forwarder
        .forward(&target, request, identity.as_ref())
        .await
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
