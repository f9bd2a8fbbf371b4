// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::{json, Value};

async fn bad_login(app: &TestApp, email: &str) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": "nope-nope" })),
    )
    .await
}

#[tokio::test]
async fn login_issues_token_for_bootstrap_admin() {
    let app = spawn_app().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["expiresAt"].is_string());

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.get("/api/v1/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn login_validates_and_rejects_bad_credentials() {
    let app = spawn_app().await;

    let (status, body) = app
        .request(Method::POST, "/api/v1/auth/login", None, Some(json!({ "email": ADMIN_EMAIL })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["password"].is_array());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "whatever" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "No user found");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid password");
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.user_with_role(&admin, "victim@example.com", "editor").await;

    for _ in 0..4 {
        let (status, _) = bad_login(&app, "victim@example.com").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = bad_login(&app, "victim@example.com").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].as_str().unwrap().contains("temporarily locked"));

    // The correct password is refused while the lockout lasts
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "victim@example.com", "password": "password-123" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].as_str().unwrap().starts_with("Account banned until"));

    let (status, logs) = app.get("/api/v1/security/logs?type=account_locked", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["severity"], "medium");
}

#[tokio::test]
async fn protected_routes_need_a_token_and_the_right_role() {
    let app = spawn_app().await;

    let (status, _) = app.request(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/posts", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.admin_token().await;
    let (_, editor) = app.user_with_role(&admin, "editor@example.com", "editor").await;
    let (_, reader) = app.user_with_role(&admin, "reader@example.com", "user").await;

    let (status, _) = app.get("/api/v1/users", &editor).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/v1/settings", &editor).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let post = json!({ "title": "Hello", "content": "World" });
    let (status, _) = app.post("/api/v1/posts", &reader, post.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/api/v1/posts", &editor, post).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn logout_writes_an_activity_row() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app.post("/api/v1/auth/logout", &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, activities) = app.get("/api/v1/user/activities", &admin).await;
    assert_eq!(activities[0]["action"], "logout");
}
