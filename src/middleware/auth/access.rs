//! route 解決 → (protected なら) bearer 検証 → UpstreamTarget / Identity を extensions に入れる
//!
//! - public route (login など) は verifier を通さない
//! - 検証失敗はその場で終了 (retry なし)
//! - `/api/v1` 付きの path も同じ route table で解決する

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::verifier::authorization_header;
use crate::state::AppState;

const API_V1_PREFIX: &str = "/api/v1";

/// 転送対象の router に route 解決 + 認証を掛ける。
///
/// 例：
/// ```ignore
/// let proxied = Router::new().fallback(handlers::proxy::forward);
/// let proxied = middleware::auth::access::apply(proxied, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

/// Path as seen by the route table (`/api/v1/reservas/1` → `/reservas/1`).
pub fn route_path(path: &str) -> &str {
    match path.strip_prefix(API_V1_PREFIX) {
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = route_path(req.uri().path()).to_string();

    let resolved = state.routes.resolve(&path).ok_or_else(|| {
        tracing::debug!(path = %path, "no route");
        AppError::no_route(path.as_str())
    })?;

    if !resolved.route.allows(req.method()) {
        return Err(AppError::MethodNotAllowed {
            method: req.method().clone(),
            allowed: resolved.route.methods.clone(),
        });
    }

    let identity = if resolved.route.is_public() {
        None
    } else {
        // owned: the request body is not Sync, so nothing borrowed from `req` may cross the await
        let raw = authorization_header(req.headers())
            .inspect_err(|err| tracing::warn!(kind = err.kind(), path = %path, "credential rejected"))?
            .map(str::to_owned);

        match state.verifier.verify(raw.as_deref()).await {
            Ok(identity) => Some(identity),
            Err(err) => {
                tracing::warn!(
                    kind = err.kind(),
                    strategy = state.verifier.strategy(),
                    path = %path,
                    error = %err,
                    "credential rejected"
                );
                return Err(err.into());
            }
        }
    };

    tracing::debug!(
        upstream = %resolved.target.upstream,
        prefix = resolved.route.prefix,
        user_id = identity.as_ref().map(|i| i.user_id()),
        "route resolved"
    );

    // middleware → handler への受け渡し
    req.extensions_mut().insert(resolved.target);
    if let Some(identity) = identity {
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}
