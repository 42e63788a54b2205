//! Shared fixtures for the gateway integration tests.
//!
//! One stub axum server plays every backend service; the gateway is built from
//! a `Config` that points all four upstreams at it.
#![allow(dead_code)]

use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::IntoResponse,
    routing::{any, get, post},
};
use campus_gateway::app::{build_router, build_state};
use campus_gateway::config::Config;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const SECRET: &str = "integration-test-secret";
pub const NOT_FOUND_BODY: &str = r#"{"detail":"not found"}"#;
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

fn header_str(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

/// Describes what the upstream received.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "user_id": header_str(&headers, "x-user-id"),
        "user_role": header_str(&headers, "x-user-role"),
        "authorization": header_str(&headers, "authorization"),
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Returns the request body untouched, with the request's content type.
async fn raw(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn missing() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        NOT_FOUND_BODY,
    )
}

async fn image() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES)
}

async fn created() -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({"id": 7})))
}

/// Answers well after the gateway's upstream timeout in the tests.
async fn slow() -> Json<Value> {
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    Json(json!({"late": true}))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

pub async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/raw", any(raw))
        .route("/missing", any(missing))
        .route("/image", get(image))
        .route("/created", post(created))
        .route("/slow", get(slow))
        .route("/health", get(health))
        .fallback(echo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Address nothing is listening on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Start a gateway whose upstreams all point at `upstream`, with `overrides` applied on top.
pub async fn spawn_gateway(upstream: &str, overrides: &[(&str, &str)]) -> String {
    let mut env: HashMap<String, String> = [
        "AUTH_SERVICE_URL",
        "RESERVAS_SERVICE_URL",
        "INCIDENCIAS_SERVICE_URL",
        "ATTENDANCE_SERVICE_URL",
    ]
    .into_iter()
    .map(|k| (k.to_string(), upstream.to_string()))
    .collect();
    env.insert("SECRET_KEY".to_string(), SECRET.to_string());
    env.insert("UPSTREAM_TIMEOUT_SECS".to_string(), "5".to_string());
    for (k, v) in overrides {
        env.insert(k.to_string(), v.to_string());
    }

    let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
    let state = build_state(&config).unwrap();
    let app = build_router(state, &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn spawn_default() -> String {
    let upstream = spawn_upstream().await;
    spawn_gateway(&upstream, &[]).await
}

fn sign(claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn token(sub: &str, role: Option<&str>) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    let mut claims = json!({"sub": sub, "exp": exp});
    if let Some(role) = role {
        claims["role"] = json!(role);
    }
    sign(claims)
}

pub fn expired_token(sub: &str) -> String {
    let exp = chrono::Utc::now().timestamp() - 3600;
    sign(json!({"sub": sub, "role": "student", "exp": exp}))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub async fn error_code(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}
