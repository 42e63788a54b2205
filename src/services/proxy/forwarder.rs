//! Forwards a (verified or public) request to its upstream and relays the answer.
//!
//! Responsibility:
//! - Build the outbound header set (sanitized copy + identity headers)
//! - Issue the call on the shared pooled client
//! - Map the outcome: success relayed as-is, upstream 4xx/5xx relayed as
//!   `AppError::Upstream`, transport failure as `AppError::ServiceUnavailable`
//!
//! Notes:
//! - Bodies are fully buffered in both directions (no streaming).
//! - The outbound call is awaited inside the handler future; dropping that
//!   future (client disconnect, request timeout) cancels the upstream call.

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::Response,
};

use crate::error::{AppError, UpstreamBody};
use crate::services::auth::Identity;
use crate::services::proxy::UpstreamTarget;

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_ROLE: HeaderName = HeaderName::from_static("x-user-role");

/// Headers that describe a single transport hop and must not be relayed.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Copy of the inbound request, taken before anything is forwarded.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub query: Option<String>,
}

impl ProxiedRequest {
    /// Bodyless GET, used for health relays.
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query: None,
        }
    }
}

/// Build the process-wide pooled client.
///
/// `timeout` bounds every upstream call, including reading the body.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Duration::from_secs(90))
        // 3xx is relayed to the caller, not followed
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn forward(
        &self,
        target: &UpstreamTarget,
        request: ProxiedRequest,
        identity: Option<&Identity>,
    ) -> Result<Response, AppError> {
        let upstream = target.upstream;
        let url = target.url(request.query.as_deref());
        let headers = outbound_headers(&request.headers, identity, target.inject_role)?;

        let mut outbound = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        if !request.body.is_empty() {
            outbound = outbound.body(request.body);
        }

        let started = Instant::now();
        let upstream_res = outbound.send().await.map_err(|e| {
            tracing::warn!(
                upstream = %upstream,
                url = %url,
                timeout = e.is_timeout(),
                connect = e.is_connect(),
                error = %e,
                "upstream unreachable"
            );
            AppError::ServiceUnavailable { upstream }
        })?;

        let status = upstream_res.status();
        let res_headers = upstream_res.headers().clone();
        let bytes = upstream_res.bytes().await.map_err(|e| {
            tracing::warn!(upstream = %upstream, url = %url, error = %e, "failed to read upstream body");
            AppError::ServiceUnavailable { upstream }
        })?;

        tracing::debug!(
            upstream = %upstream,
            method = %request.method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upstream responded"
        );

        if status.is_client_error() || status.is_server_error() {
            let body = UpstreamBody {
                content_type: res_headers.get(header::CONTENT_TYPE).cloned(),
                bytes,
            };
            tracing::info!(
                upstream = %upstream,
                status = status.as_u16(),
                detail = %body.detail(),
                "upstream returned an error"
            );
            return Err(AppError::Upstream {
                upstream,
                status,
                body,
            });
        }

        if is_json(&res_headers) && serde_json::from_slice::<serde::de::IgnoredAny>(&bytes).is_err() {
            tracing::warn!(upstream = %upstream, url = %url, "upstream declared JSON but sent something else; relaying raw");
        }

        Ok(relay(status, &res_headers, bytes))
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Sanitized copy of the inbound headers plus the caller's identity.
///
/// Client-supplied `X-User-ID` / `X-User-Role` never reach an upstream.
/// An identity that cannot be carried in a header fails the request; it is
/// never forwarded as anonymous.
pub fn outbound_headers(
    inbound: &HeaderMap,
    identity: Option<&Identity>,
    inject_role: bool,
) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 2);

    for (name, value) in inbound {
        if *name == header::HOST
            || *name == header::CONTENT_LENGTH
            || *name == X_USER_ID
            || *name == X_USER_ROLE
            || is_hop_by_hop(name)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(identity) = identity {
        let user_id = HeaderValue::from_str(identity.user_id()).map_err(|_| {
            tracing::error!(user_id = identity.user_id(), "user id is not a valid header value");
            AppError::Internal
        })?;
        headers.insert(X_USER_ID, user_id);

        if inject_role {
            if let Some(role) = identity.role() {
                let role = HeaderValue::from_str(role).map_err(|_| {
                    tracing::error!(user_id = identity.user_id(), role, "role is not a valid header value");
                    AppError::Internal
                })?;
                headers.insert(X_USER_ROLE, role);
            }
        }
    }

    Ok(headers)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Relay a non-error upstream response: status, headers (minus hop-by-hop) and body bytes.
fn relay(status: StatusCode, upstream_headers: &HeaderMap, bytes: Bytes) -> Response {
    let mut res = Response::new(Body::from(bytes));
    *res.status_mut() = status;

    let headers = res.headers_mut();
    for (name, value) in upstream_headers {
        if *name == header::CONTENT_LENGTH || is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    res
}
