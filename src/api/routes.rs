/*
 * Responsibility
 * - gateway の URL 構造を定義
 * - /, /health, /health/{service}, /auth/health は認証なしで直接処理
 * - それ以外はすべて route table 経由の転送 (access middleware を fallback に掛ける)
 */
use axum::{Router, routing::get};

use crate::api::handlers::{
    health::{auth_health, health, info, upstream_health},
    proxy::forward,
};
use crate::middleware::auth::access;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let proxied = access::apply(Router::new().fallback(forward), state);

    Router::new()
        .route("/", get(info))
        .route("/health", get(health))
        .route("/health/{service}", get(upstream_health))
        .route("/auth/health", get(auth_health))
        .merge(proxied)
}
