/*
 * Responsibility
 * - GET /        (gateway の案内)
 * - GET /health  (gateway 自身の liveness)
 * - GET /health/{service}, /auth/health (upstream の /health をそのまま中継)
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AppError;
use crate::services::proxy::{ProxiedRequest, Upstream};
use crate::state::AppState;

pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    let prefixes = state
        .routes
        .routes()
        .iter()
        .map(|r| r.prefix)
        .collect::<Vec<_>>();

    Json(json!({
        "message": "Welcome to Campus360 API Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": prefixes,
    }))
}

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "api-gateway",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

pub async fn upstream_health(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Response, AppError> {
    let upstream = Upstream::from_name(&service)
        .ok_or_else(|| AppError::no_route(format!("/health/{service}")))?;

    relay_health(&state, upstream).await
}

pub async fn auth_health(State(state): State<AppState>) -> Result<Response, AppError> {
    relay_health(&state, Upstream::Auth).await
}

async fn relay_health(state: &AppState, upstream: Upstream) -> Result<Response, AppError> {
    let target = state.routes.health_target(upstream);
    state
        .forwarder
        .forward(&target, ProxiedRequest::get(), None)
        .await
}
