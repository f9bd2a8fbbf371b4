// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Site settings (admin only)

use crate::auth::AdminUser;
use crate::error::ServerResult;
use crate::handlers::audit;
use crate::middleware::ClientInfo;
use crate::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use folio_api_contract::{ApiKeyResponse, SuccessResponse};
use serde_json::{json, Value};

pub async fn get_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<Value>> {
    Ok(Json(state.settings.get().await?))
}

/// Deep-merge a patch into the stored document
pub async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Json(patch): Json<Value>,
) -> ServerResult<Json<Value>> {
    let document = state.settings.update(&patch, &admin.id).await?;
    let sections: Vec<&String> = patch.as_object().map(|o| o.keys().collect()).unwrap_or_default();
    audit(&state, &admin, &client, "settings_updated", json!({ "sections": sections }))?;
    Ok(Json(document))
}

pub async fn clear_cache(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<SuccessResponse>> {
    state.settings.clear_cache().await;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn export_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<impl IntoResponse> {
    let document = state.settings.get().await?;
    let body = serde_json::to_string_pretty(&document)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"settings.json\""),
        ],
        body,
    ))
}

pub async fn import_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Json(document): Json<Value>,
) -> ServerResult<Json<Value>> {
    let document = state.settings.replace(document, &admin.id).await?;
    audit(&state, &admin, &client, "settings_imported", json!({}))?;
    Ok(Json(document))
}

/// The key is only ever shown in this response
pub async fn rotate_api_key(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
) -> ServerResult<Json<ApiKeyResponse>> {
    let api_key = state.settings.rotate_api_key(&admin.id).await?;
    audit(&state, &admin, &client, "api_key_rotated", json!({}))?;
    Ok(Json(ApiKeyResponse { api_key }))
}
