// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, TestApp};
use serde_json::{json, Value};

async fn track(app: &TestApp, event: Value) -> (StatusCode, Value) {
    app.request(Method::POST, "/api/v1/analytics/track", None, Some(event))
        .await
}

fn pageview(url: &str, session: &str) -> Value {
    json!({
        "pageUrl": url,
        "userAgent": "Mozilla/5.0",
        "browser": "Firefox",
        "device": "desktop",
        "country": "NZ",
        "sessionId": session
    })
}

#[tokio::test]
async fn blog_pageviews_count_towards_the_post() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, post) = app
        .post(
            "/api/v1/posts",
            &admin,
            json!({ "title": "Counted", "content": "x", "status": "published" }),
        )
        .await;

    for session in ["s1", "s2"] {
        let (status, body) = track(&app, pageview("/blog/counted", session)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
    }
    // Unknown slugs and clicks are stored without touching any post
    track(&app, pageview("/blog/missing", "s3")).await;
    track(
        &app,
        json!({ "pageUrl": "/blog/counted", "eventType": "click", "clickX": 10, "clickY": 20 }),
    )
    .await;

    let id = post["id"].as_str().unwrap();
    let (_, post) = app.get(&format!("/api/v1/posts/{id}"), &admin).await;
    assert_eq!(post["views"], 2);

    let (status, dashboard) = app.get("/api/v1/analytics/dashboard?range=24h", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["stats"][0]["label"], "Total Visitors");
    assert_eq!(dashboard["stats"][1]["value"], 2.0);
    assert_eq!(dashboard["pages"][0]["url"], "/blog/counted");
    assert_eq!(dashboard["pages"][0]["views"], 2);
    // Yesterday and today
    assert_eq!(dashboard["traffic"]["labels"].as_array().unwrap().len(), 2);

    let (_, overview) = app.get("/api/v1/analytics/overview?range=month", &admin).await;
    assert_eq!(overview["stats"]["totalViews"], 2);
    assert_eq!(overview["stats"]["totalPosts"], 1);
    assert_eq!(overview["popularPosts"][0]["title"], "Counted");
}

#[tokio::test]
async fn track_checks_required_fields() {
    let app = spawn_app().await;

    let (status, _) = track(&app, json!({ "pageUrl": "/" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        track(&app, json!({ "pageUrl": "/", "eventType": "click", "clickX": 4 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = track(&app, json!({ "userAgent": "curl" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ranges_are_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app.get("/api/v1/analytics/dashboard?range=year", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/v1/analytics/overview?range=7d", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/v1/analytics/dashboard", &admin).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn realtime_and_heatmap_reflect_recent_events() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    track(&app, pageview("/", "a")).await;
    track(&app, pageview("/pricing", "b")).await;
    track(
        &app,
        json!({
            "pageUrl": "/pricing",
            "eventType": "click",
            "clickX": 5,
            "clickY": 7,
            "sessionId": "b"
        }),
    )
    .await;
    track(
        &app,
        json!({
            "pageUrl": "/pricing",
            "eventType": "click",
            "clickX": 5,
            "clickY": 7,
            "sessionId": "a"
        }),
    )
    .await;

    let (status, realtime) = app.get("/api/v1/analytics/realtime", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(realtime["activeVisitors"], 2);
    assert_eq!(realtime["recentVisitors"].as_array().unwrap().len(), 4);

    let (_, visitors) = app.get("/api/v1/analytics/realtime/visitors", &admin).await;
    assert_eq!(visitors[0]["page"], "/pricing");

    let (_, heatmap) = app.get("/api/v1/analytics/heatmap?page_url=/pricing", &admin).await;
    let heatmap = heatmap.as_array().unwrap();
    assert_eq!(heatmap.len(), 1);
    assert_eq!(heatmap[0]["value"], 2);
    assert_eq!(heatmap[0]["x"], 5);
}

#[tokio::test]
async fn analytics_reads_need_a_session() {
    let app = spawn_app().await;
    let (status, _) = app
        .request(Method::GET, "/api/v1/analytics/realtime", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
