// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Health check endpoints

use crate::state::AppState;
use crate::ServerResult;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

impl HealthResponse {
    fn now(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub build_info: BuildInfo,
}

/// Build information
#[derive(Serialize)]
pub struct BuildInfo {
    pub git_commit: Option<String>,
    pub build_date: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> ServerResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse::now("ok")))
}

/// Readiness check endpoint; fails while the database is unreachable
pub async fn readiness_check(State(state): State<AppState>) -> ServerResult<Json<HealthResponse>> {
    state.db.ping()?;
    Ok(Json(HealthResponse::now("ready")))
}

/// Version endpoint
pub async fn version() -> ServerResult<Json<VersionResponse>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_info: BuildInfo {
            git_commit: option_env!("FOLIO_GIT_SHA").map(|s| s.to_string()),
            build_date: option_env!("FOLIO_BUILD_DATE").map(|s| s.to_string()),
        },
    };
    Ok(Json(response))
}
