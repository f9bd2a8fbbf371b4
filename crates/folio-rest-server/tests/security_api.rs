// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{body_json, spawn_app, TestApp};
use serde_json::json;

async fn get_from(app: &TestApp, uri: &str, token: &str, ip: &str) -> StatusCode {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap();
    app.send(request).await.status()
}

#[tokio::test]
async fn script_bodies_are_rejected_and_logged() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/v1/posts",
            &admin,
            json!({ "title": "<script>alert('x')</script>", "content": "hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid request content");

    let (_, posts) = app.get("/api/v1/posts", &admin).await;
    assert!(posts.as_array().unwrap().is_empty());

    let (_, threats) = app.get("/api/v1/security/threats", &admin).await;
    let threats = threats.as_array().unwrap();
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0]["type"], "threat_detected");
    assert_eq!(threats[0]["severity"], "high");

    // High severity fans out to the admins
    let (_, alerts) = app.get("/api/v1/security/alerts", &admin).await;
    assert_eq!(alerts[0]["notificationSent"], true);
    let (_, notifications) = app.get("/api/v1/notifications", &admin).await;
    assert_eq!(notifications[0]["category"], "security");

    let id = threats[0]["id"].as_str().unwrap();
    let (status, resolved) = app
        .post(&format!("/api/v1/security/logs/{id}/resolve"), &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["resolved"], true);
    let (_, threats) = app.get("/api/v1/security/threats", &admin).await;
    assert!(threats.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn reads_pass_the_threat_filter() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (status, _) = app
        .get("/api/v1/search?q=%3Cscript%3Ex%3C%2Fscript%3E", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn blocked_addresses_are_refused_until_unblocked() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let ip = "203.0.113.7";

    assert_eq!(get_from(&app, "/api/v1/auth/me", &admin, ip).await, StatusCode::OK);

    let (status, blocked) = app
        .post(
            "/api/v1/security/blocked-ips",
            &admin,
            json!({ "ip": ip, "reason": "scraping" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(blocked["expiresAt"].is_null());

    assert_eq!(get_from(&app, "/api/v1/auth/me", &admin, ip).await, StatusCode::FORBIDDEN);
    assert_eq!(
        get_from(&app, "/api/v1/auth/me", &admin, "198.51.100.1").await,
        StatusCode::OK
    );

    let (_, list) = app.get("/api/v1/security/blocked-ips", &admin).await;
    assert_eq!(list[0]["ip"], ip);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/security/blocked-ips/{ip}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(get_from(&app, "/api/v1/auth/me", &admin, ip).await, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/security/blocked-ips/{ip}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pattern_rules_take_effect_immediately() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .post(
            "/api/v1/security/rules",
            &admin,
            json!({ "name": "broken", "type": "pattern", "pattern": "(unclosed" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rule) = app
        .post(
            "/api/v1/security/rules",
            &admin,
            json!({ "name": "no casinos", "type": "pattern", "pattern": "casino\\s+bonus" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rule["enabled"], true);

    let (status, _) = app
        .post(
            "/api/v1/posts",
            &admin,
            json!({ "title": "Free CASINO   bonus", "content": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, rules) = app.get("/api/v1/security/rules", &admin).await;
    assert_eq!(rules.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_actions_land_in_the_audit_trail() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (user_id, _) = app.user_with_role(&admin, "audited@example.com", "user").await;

    let (status, _) = app
        .post(
            &format!("/api/v1/users/{user_id}/ban"),
            &admin,
            json!({ "duration": "7d", "reason": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, trail) = app.get("/api/v1/security/audit", &admin).await;
    let actions: Vec<&str> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["user_banned", "user_created"]);

    let (_, logs) = app.get("/api/v1/security/logs?severity=high", &admin).await;
    assert!(logs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn security_endpoints_are_admin_only() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, editor) = app.user_with_role(&admin, "ed@example.com", "editor").await;

    let request = Request::builder()
        .uri("/api/v1/security/logs")
        .header(header::AUTHORIZATION, format!("Bearer {editor}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], 403);
}
