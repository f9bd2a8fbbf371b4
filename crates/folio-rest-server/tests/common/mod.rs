// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use folio_local_db::Database;
use folio_rest_server::dependencies::DefaultServerDependencies;
use folio_rest_server::server::build_app;
use folio_rest_server::services::{BackupStore, FilesystemBackupStore};
use folio_rest_server::state::AppState;
use folio_rest_server::ServerConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";

/// In-process app over an in-memory database and a scratch backup dir
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = Some("integration-test-secret".into());
    config.auth.bootstrap_admin_email = Some(ADMIN_EMAIL.into());
    config.auth.bootstrap_admin_password = Some(ADMIN_PASSWORD.into());
    config.rate_limit.requests_per_minute = 10_000;
    config.backup.dir = dir.path().to_path_buf();

    let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
    let store: Arc<dyn BackupStore> = Arc::new(FilesystemBackupStore::new(dir.path()));
    let state = DefaultServerDependencies::with_parts(config.clone(), db, store)
        .await
        .expect("dependencies")
        .into_state();
    let app = build_app(state.clone(), &config);

    TestApp {
        app,
        state,
        _dir: dir,
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.expect("response")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Create an account through the admin API and sign it in
    pub async fn user_with_role(
        &self,
        admin_token: &str,
        email: &str,
        role: &str,
    ) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/v1/users",
                admin_token,
                json!({
                    "email": email,
                    "name": "Test User",
                    "password": "password-123",
                    "role": role
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {body}");
        let id = body["id"].as_str().expect("id").to_string();
        let token = self.login(email, "password-123").await;
        (id, token)
    }
}
