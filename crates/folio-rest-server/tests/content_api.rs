// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn post_slugs_are_derived_and_unique() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, post) = app
        .post(
            "/api/v1/posts",
            &admin,
            json!({ "title": "Hello Rust World", "content": "Body", "tags": ["rust"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["slug"], "hello-rust-world");
    assert_eq!(post["status"], "draft");

    let (status, body) = app
        .post("/api/v1/posts", &admin, json!({ "title": "Hello, Rust World!", "content": "Again" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("hello-rust-world"));

    // Keeping its own slug on update is not a conflict
    let id = post["id"].as_str().unwrap();
    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/posts/{id}"),
            Some(&admin),
            Some(json!({
                "title": "Hello Rust World",
                "content": "Edited",
                "slug": "hello-rust-world"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "Edited");
}

#[tokio::test]
async fn public_reads_only_see_published_posts() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    app.post("/api/v1/posts", &admin, json!({ "title": "Draft one", "content": "x" }))
        .await;
    let (status, _) = app
        .post(
            "/api/v1/posts",
            &admin,
            json!({ "title": "Live one", "content": "y", "status": "published" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, posts) = app.request(Method::GET, "/api/v1/public/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["slug"], "live-one");

    let (status, _) = app
        .request(Method::GET, "/api/v1/public/posts/draft-one", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, post) = app
        .request(Method::GET, "/api/v1/public/posts/live-one", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["title"], "Live one");
}

#[tokio::test]
async fn publishing_notifies_admins() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, editor) = app.user_with_role(&admin, "writer@example.com", "editor").await;

    // Account creation already produced one notification
    let (_, before) = app.get("/api/v1/notifications", &admin).await;
    let before = before.as_array().unwrap().len();

    let (status, _) = app
        .post(
            "/api/v1/posts",
            &editor,
            json!({ "title": "Fresh", "content": "news", "status": "published" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, after) = app.get("/api/v1/notifications?unreadOnly=true", &admin).await;
    let after = after.as_array().unwrap();
    assert_eq!(after.len(), before + 1);
    assert_eq!(after[0]["title"], "New post published");
}

fn project(title: &str, category: &str) -> serde_json::Value {
    json!({
        "title": title,
        "category": category,
        "description": format!("{title} description"),
        "image": "/images/p.png",
        "services": ["Design", "Build"],
        "status": "published"
    })
}

#[tokio::test]
async fn portfolio_stats_categories_and_bulk() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let mut ids = Vec::new();
    for (title, category) in [("Alpha", "Branding"), ("Beta", "Branding"), ("Gamma", "Sculpture")] {
        let (status, item) = app.post("/api/v1/portfolio", &admin, project(title, category)).await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(item["id"].as_str().unwrap().to_string());
    }

    let (status, liked) = app
        .post(&format!("/api/v1/portfolio/{}/like", ids[0]), &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["likes"], 1);

    let (_, stats) = app.get("/api/v1/portfolio/stats", &admin).await;
    assert_eq!(stats["totalProjects"], 3);
    assert_eq!(stats["totalLikes"], 1);
    assert_eq!(stats["totalCategories"], 2);
    assert_eq!(stats["popularCategories"][0]["category"], "Branding");

    let (_, categories) = app.get("/api/v1/portfolio/categories", &admin).await;
    let categories: Vec<&str> = categories
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert_eq!(categories[0], "Web Development");
    assert_eq!(categories.iter().filter(|c| **c == "Branding").count(), 1);
    assert_eq!(categories.last(), Some(&"Sculpture"));

    let (status, bulk) = app
        .post(
            "/api/v1/portfolio/bulk",
            &admin,
            json!({ "ids": [ids[1].clone(), ids[2].clone()], "action": "archive" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bulk["affected"], 2);

    let (_, published) = app.request(Method::GET, "/api/v1/public/portfolio", None, None).await;
    assert_eq!(published.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn portfolio_export_is_csv() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, item) = app.post("/api/v1/portfolio", &admin, project("Alpha", "Branding")).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/portfolio/export")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "ids": [item["id"]] }).to_string()))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("title,category,description,client,date,views,likes,services,author,created_at")
    );
    assert!(lines.next().unwrap().contains("Design; Build"));
}

#[tokio::test]
async fn testimonials_and_pricing_round_out_the_public_site() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/v1/testimonials",
            &admin,
            json!({ "name": "Jo", "rating": 6, "review": "Great" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["rating"].is_array());

    let (status, _) = app
        .post(
            "/api/v1/testimonials",
            &admin,
            json!({ "name": "Jo", "rating": 5, "review": "Great" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    for (name, order) in [("Pro", 2), ("Starter", 1)] {
        let (status, plan) = app
            .post(
                "/api/v1/pricing",
                &admin,
                json!({ "name": name, "priceCents": 4900, "sortOrder": order, "features": ["A"] }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(plan["currency"], "USD");
    }

    let (_, plans) = app.request(Method::GET, "/api/v1/public/pricing", None, None).await;
    assert_eq!(plans[0]["name"], "Starter");
    let (_, testimonials) = app
        .request(Method::GET, "/api/v1/public/testimonials", None, None)
        .await;
    assert_eq!(testimonials.as_array().unwrap().len(), 1);
}
