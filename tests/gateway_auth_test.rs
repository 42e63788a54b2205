mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn protected_route_without_header_is_401_missing_credential() {
    let gw = spawn_default().await;

    let res = reqwest::get(format!("{gw}/reservas/items")).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");
    assert_eq!(error_code(res).await, "MISSING_CREDENTIAL");
}

#[tokio::test]
async fn non_bearer_scheme_is_malformed_credential() {
    let gw = spawn_default().await;
    let client = reqwest::Client::new();

    for value in ["Basic xyz", "Bearer", "Bearer a b"] {
        let res = client
            .get(format!("{gw}/incidencias/1"))
            .header("authorization", value)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{value}");
        assert_eq!(error_code(res).await, "MALFORMED_CREDENTIAL", "{value}");
    }
}

#[tokio::test]
async fn expired_token_is_token_expired() {
    let gw = spawn_default().await;

    let res = reqwest::Client::new()
        .get(format!("{gw}/reservas/items"))
        .header("authorization", bearer(&expired_token("u1")))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "TOKEN_EXPIRED");
}

#[tokio::test]
async fn corrupt_token_is_malformed_token() {
    let gw = spawn_default().await;

    let res = reqwest::Client::new()
        .get(format!("{gw}/reservas/items"))
        .header("authorization", "Bearer not-a-jwt")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "MALFORMED_TOKEN");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let gw = spawn_default().await;
    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({"sub": "u1", "exp": chrono::Utc::now().timestamp() + 600}),
        &jsonwebtoken::EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let res = reqwest::Client::new()
        .get(format!("{gw}/reservas/items"))
        .header("authorization", bearer(&forged))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "INVALID_TOKEN");
}

#[tokio::test]
async fn admin_and_attendance_receive_identity_and_role() {
    let gw = spawn_default().await;
    let client = reqwest::Client::new();
    let auth = bearer(&token("u1", Some("admin")));

    let res = client
        .get(format!("{gw}/auth/admin/users"))
        .header("authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["path"], "/admin/users");
    assert_eq!(seen["user_id"], "u1");
    assert_eq!(seen["user_role"], "admin");

    let res = client
        .get(format!("{gw}/attendance/sessions/3"))
        .header("authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["path"], "/api/attendance/sessions/3");
    assert_eq!(seen["user_id"], "u1");
    assert_eq!(seen["user_role"], "admin");
}

#[tokio::test]
async fn other_services_receive_identity_without_role() {
    let gw = spawn_default().await;

    let res = reqwest::Client::new()
        .get(format!("{gw}/incidencias/5"))
        .header("authorization", bearer(&token("u1", Some("admin"))))
        .send()
        .await
        .unwrap();

    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["user_id"], "u1");
    assert_eq!(seen["user_role"], Value::Null);
    // the credential itself is passed on
    assert!(seen["authorization"].as_str().unwrap().starts_with("Bearer "));
}

#[tokio::test]
async fn token_without_role_sends_no_role_header() {
    let gw = spawn_default().await;

    let res = reqwest::Client::new()
        .get(format!("{gw}/attendance/today"))
        .header("authorization", bearer(&token("u2", None)))
        .send()
        .await
        .unwrap();

    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["user_id"], "u2");
    assert_eq!(seen["user_role"], Value::Null);
}

#[tokio::test]
async fn client_supplied_identity_headers_are_replaced() {
    let gw = spawn_default().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{gw}/attendance/today"))
        .header("authorization", bearer(&token("u1", Some("student"))))
        .header("x-user-id", "someone-else")
        .header("x-user-role", "admin")
        .send()
        .await
        .unwrap();
    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["user_id"], "u1");
    assert_eq!(seen["user_role"], "student");

    let res = client
        .post(format!("{gw}/auth/login"))
        .header("x-user-id", "someone-else")
        .json(&json!({"email": "a@b.c", "password": "pw"}))
        .send()
        .await
        .unwrap();
    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["user_id"], Value::Null);
}

#[tokio::test]
async fn login_is_forwarded_without_credentials() {
    let gw = spawn_default().await;

    let res = reqwest::Client::new()
        .post(format!("{gw}/auth/login"))
        .json(&json!({"email": "a@b.c", "password": "pw"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["path"], "/auth/login");
    let body: Value = serde_json::from_str(seen["body"].as_str().unwrap()).unwrap();
    assert_eq!(body["email"], "a@b.c");
}

#[tokio::test]
async fn remote_verifier_outage_is_503() {
    let upstream = spawn_upstream().await;
    let refused = refused_url().await;
    // auth service down; the other services are up
    let gw = spawn_gateway(
        &upstream,
        &[("AUTH_VERIFIER", "remote"), ("AUTH_SERVICE_URL", refused.as_str())],
    )
    .await;

    let res = reqwest::Client::new()
        .get(format!("{gw}/reservas/items"))
        .header("authorization", bearer(&token("u1", None)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(res).await, "AUTH_SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn identity_that_cannot_be_sent_as_a_header_fails_the_request() {
    let gw = spawn_default().await;

    let res = reqwest::Client::new()
        .get(format!("{gw}/reservas/x"))
        .header("authorization", bearer(&token("josé", Some("admin"))))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(res).await, "INTERNAL");
}

#[tokio::test]
async fn wrongly_typed_subject_is_invalid_claims() {
    let gw = spawn_default().await;
    let numeric_sub = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({"sub": 42, "exp": chrono::Utc::now().timestamp() + 600}),
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let res = reqwest::Client::new()
        .get(format!("{gw}/reservas/x"))
        .header("authorization", bearer(&numeric_sub))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "INVALID_CLAIMS");
}
