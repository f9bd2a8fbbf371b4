// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Content backups (admin only)

use crate::auth::AdminUser;
use crate::error::ServerResult;
use crate::handlers::audit;
use crate::middleware::ClientInfo;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use folio_api_contract::{
    BackupCleanup, BackupCreated, BackupKind, BackupRecord, RestoreRequest, SuccessResponse,
};
use serde_json::json;
use validator::Validate;

pub async fn list_backups(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<Vec<BackupRecord>>> {
    Ok(Json(state.backups.list()?))
}

/// The snapshot file as a JSON attachment
pub async fn download_backup(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(filename): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let bytes = state.backups.download(&filename).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}

pub async fn create_backup(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
) -> ServerResult<(StatusCode, Json<BackupCreated>)> {
    let record = state.backups.create(BackupKind::Full).await?;
    audit(&state, &admin, &client, "backup_created", json!({ "filename": record.filename }))?;
    Ok((
        StatusCode::CREATED,
        Json(BackupCreated {
            success: true,
            filename: record.filename,
        }),
    ))
}

pub async fn restore_backup(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Json(request): Json<RestoreRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    request.validate()?;
    state.backups.restore(&request.filename).await?;
    state.settings.clear_cache().await;
    audit(&state, &admin, &client, "backup_restored", json!({ "filename": request.filename }))?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn cleanup_backups(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<BackupCleanup>> {
    let removed = state.backups.cleanup(Utc::now()).await?;
    Ok(Json(BackupCleanup { removed }))
}
