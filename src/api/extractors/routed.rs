use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::Identity;
use crate::services::proxy::UpstreamTarget;

/// Identity placed in the extensions by the access middleware.
/// Public routes carry none.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Identity>);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(parts.extensions.get::<Identity>().cloned()))
    }
}

/// Upstream target resolved by the access middleware.
///
/// Missing means the handler is mounted without the middleware; reported as no route.
#[derive(Debug, Clone)]
pub struct Routed(pub UpstreamTarget);

impl<S> FromRequestParts<S> for Routed
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UpstreamTarget>()
            .cloned()
            .map(Routed)
            .ok_or_else(|| AppError::no_route(parts.uri.path()))
    }
}
