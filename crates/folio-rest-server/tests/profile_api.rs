// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn profile_update_is_recorded_as_activity() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, token) = app.user_with_role(&admin, "writer@example.com", "editor").await;

    let (status, profile) = app
        .request(
            Method::PATCH,
            "/api/v1/user/profile",
            Some(&token),
            Some(json!({ "bio": "Hello", "location": "Lisbon" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{profile}");
    assert_eq!(profile["bio"], "Hello");
    assert_eq!(profile["email"], "writer@example.com");

    let (_, fetched) = app.get("/api/v1/user/profile", &token).await;
    assert_eq!(fetched["location"], "Lisbon");

    let (status, activities) = app.get("/api/v1/user/activities", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(activities[0]["action"], "profile_update");
    assert_eq!(activities[0]["metadata"]["changes"]["bio"], "Hello");
}

#[tokio::test]
async fn invalid_profile_website_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .request(
            Method::PATCH,
            "/api/v1/user/profile",
            Some(&admin),
            Some(json!({ "website": "not a url" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["errors"]["website"].is_array());
}

#[tokio::test]
async fn two_factor_toggle_writes_security_log() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (user_id, token) = app.user_with_role(&admin, "guard@example.com", "user").await;

    let (status, overview) = app
        .request(
            Method::PATCH,
            "/api/v1/user/security",
            Some(&token),
            Some(json!({ "twoFactorEnabled": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{overview}");
    assert_eq!(overview["twoFactorEnabled"], true);

    let log = &overview["securityLogs"][0];
    assert_eq!(log["type"], "change");
    assert_eq!(log["severity"], "low");
    assert_eq!(log["userId"], user_id.as_str());
    assert_eq!(log["details"]["twoFactorEnabled"], true);

    let (status, logs) = app.get("/api/v1/user/security/activities", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs[0]["message"], "Two-factor authentication enabled");
}

#[tokio::test]
async fn password_change_checks_current_and_length() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, token) = app.user_with_role(&admin, "pw@example.com", "user").await;

    let (status, body) = app
        .post(
            "/api/v1/user/security/password",
            &token,
            json!({ "currentPassword": "wrong-password", "newPassword": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let (status, body) = app
        .post(
            "/api/v1/user/security/password",
            &token,
            json!({ "currentPassword": "password-123", "newPassword": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["new_password"][0], "must be at least 8 characters");

    let (status, _) = app
        .post(
            "/api/v1/user/security/password",
            &token,
            json!({ "currentPassword": "password-123", "newPassword": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "pw@example.com", "password": "password-123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    app.login("pw@example.com", "brand-new-pass").await;

    let (_, logs) = app.get("/api/v1/user/security/activities", &token).await;
    assert_eq!(logs[0]["type"], "password_change");
}
