// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{body_json, spawn_app};
use serde_json::json;

#[tokio::test]
async fn health_endpoints_and_schema_are_public() {
    let app = spawn_app().await;

    let (status, health) = app.request(Method::GET, "/api/v1/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let (status, ready) = app.request(Method::GET, "/api/v1/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["status"], "ready");

    let (status, schema) = app.request(Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(schema["openapi"].as_str().unwrap().starts_with('3'));
}

#[tokio::test]
async fn settings_merge_patches_and_export() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (_, defaults) = app.get("/api/v1/settings", &admin).await;
    assert_eq!(defaults["smtp"]["port"], 587);

    let (status, updated) = app
        .request(
            Method::PATCH,
            "/api/v1/settings",
            Some(&admin),
            Some(json!({ "siteName": "Studio", "smtp": { "port": 2525 } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["siteName"], "Studio");
    assert_eq!(updated["smtp"]["port"], 2525);
    assert_eq!(updated["smtp"]["emailTemplate"], "default");
    assert!(updated["updatedBy"].is_string());

    let (_, stored) = app.get("/api/v1/settings", &admin).await;
    assert_eq!(stored["siteName"], "Studio");

    let (status, key) = app.post("/api/v1/settings/api-key", &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let api_key = key["apiKey"].as_str().unwrap();
    assert!(!api_key.is_empty());
    let (_, stored) = app.get("/api/v1/settings", &admin).await;
    assert_eq!(stored["api"]["apiKey"], api_key);

    let request = Request::builder()
        .uri("/api/v1/settings/export")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("settings.json"));
    assert_eq!(body_json(response).await["siteName"], "Studio");

    let (_, trail) = app.get("/api/v1/security/audit", &admin).await;
    assert_eq!(trail[1]["action"], "settings_updated");
    assert_eq!(trail[1]["details"]["sections"], json!(["siteName", "smtp"]));
}

#[tokio::test]
async fn backups_restore_content() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (_, post) = app
        .post("/api/v1/posts", &admin, json!({ "title": "Keep me", "content": "x" }))
        .await;
    let (status, created) = app.post("/api/v1/backups", &admin, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["success"], true);
    let filename = created["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("backup-") && filename.ends_with(".json"));

    let (_, backups) = app.get("/api/v1/backups", &admin).await;
    assert_eq!(backups[0]["filename"], filename);
    assert_eq!(backups[0]["type"], "full");
    assert_eq!(backups[0]["status"], "completed");

    let request = Request::builder()
        .uri(format!("/api/v1/backups/{filename}"))
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap(),
        format!("attachment; filename=\"{filename}\"")
    );
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["data"]["posts"][0]["title"], "Keep me");

    let (status, _) = app.get("/api/v1/backups/backup-missing.json", &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/v1/backups/settings.db", &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = post["id"].as_str().unwrap();
    let (status, _) = app
        .request(Method::DELETE, &format!("/api/v1/posts/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post("/api/v1/backups/restore", &admin, json!({ "filename": filename }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, restored) = app.get(&format!("/api/v1/posts/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["title"], "Keep me");

    let (status, _) = app
        .post("/api/v1/backups/restore", &admin, json!({ "filename": "backup-missing.json" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, cleanup) = app.post("/api/v1/backups/cleanup", &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleanup["removed"], 0);
}

#[tokio::test]
async fn search_spans_posts_users_and_portfolio() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    app.post(
        "/api/v1/posts",
        &admin,
        json!({ "title": "Aurora notes", "content": "x", "excerpt": "Night sky" }),
    )
    .await;
    app.post(
        "/api/v1/portfolio",
        &admin,
        json!({
            "title": "Aurora brand",
            "category": "Branding",
            "description": "Identity",
            "image": "/a.png"
        }),
    )
    .await;

    let (status, found) = app.get("/api/v1/search?q=aurora", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let results = found["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["type"], "post");
    assert_eq!(results[0]["description"], "Night sky");
    assert_eq!(results[1]["type"], "portfolio");

    let (_, found) = app.get("/api/v1/search?q=admin%40example", &admin).await;
    assert_eq!(found["results"][0]["type"], "user");

    let (_, empty) = app.get("/api/v1/search?q=%20%20", &admin).await;
    assert!(empty["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn notifications_belong_to_their_owner() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, editor) = app.user_with_role(&admin, "owner@example.com", "editor").await;

    let (_, mine) = app.get("/api/v1/notifications", &admin).await;
    assert_eq!(mine[0]["title"], "New user registered");
    let id = mine[0]["id"].as_str().unwrap();

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/notifications/{id}/read"),
            Some(&editor),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::PATCH, &format!("/api/v1/notifications/{id}/read"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, unread) = app.get("/api/v1/notifications?unreadOnly=true", &admin).await;
    assert!(unread.as_array().unwrap().is_empty());

    let (status, sent) = app
        .post(
            "/api/v1/notifications/system",
            &admin,
            json!({ "title": "Maintenance", "message": "Tonight at 22:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["sent"], 1);

    let (status, _) = app
        .post(
            "/api/v1/notifications/system",
            &editor,
            json!({ "title": "Nope", "message": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn preference_patches_are_merged_and_checked() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, prefs) = app
        .request(
            Method::PATCH,
            "/api/v1/notifications/preferences",
            Some(&admin),
            Some(json!({ "soundEnabled": false, "quietHours": { "enabled": true } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["soundEnabled"], false);
    assert_eq!(prefs["emailNotifications"], true);
    assert_eq!(prefs["quietHours"]["start"], "22:00");

    let (status, _) = app
        .request(
            Method::PATCH,
            "/api/v1/notifications/preferences",
            Some(&admin),
            Some(json!({ "quietHours": { "start": "25:00" } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stored) = app.get("/api/v1/notifications/preferences", &admin).await;
    assert_eq!(stored["soundEnabled"], false);
}

#[tokio::test]
async fn dashboard_summary_counts_content() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    app.post("/api/v1/posts", &admin, json!({ "title": "One", "content": "x" }))
        .await;
    app.post(
        "/api/v1/posts",
        &admin,
        json!({ "title": "Two", "content": "x", "status": "published" }),
    )
    .await;

    let (status, summary) = app.get("/api/v1/dashboard/summary", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["posts"], json!({ "total": 2, "published": 1, "draft": 1 }));
    assert_eq!(summary["users"], 1);
    assert_eq!(summary["portfolioItems"], 0);
    assert_eq!(summary["recentPosts"][0]["title"], "Two");
    assert_eq!(summary["recentActivities"][0]["action"], "post_created");
}
