// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The caller's notifications and delivery preferences, plus admin fan-out

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ServerError, ServerResult};
use crate::services::Audience;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use folio_api_contract::{
    merge_json, BulkNotificationRequest, NewNotification, Notification, NotificationPreferences,
    NotificationQuery, SuccessResponse,
};
use folio_local_db::{NotificationStore, UserStore};
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct SentResponse {
    pub sent: usize,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: u64,
}

fn not_found(id: &str) -> ServerError {
    ServerError::NotFound(format!("notification '{id}' not found"))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<NotificationQuery>,
) -> ServerResult<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let notifications = state.db.with_conn(|conn| {
        NotificationStore::new(conn).list(&user.id, query.unread_only, limit)
    })?;
    Ok(Json(notifications))
}

/// Someone else's notification is reported as missing
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ServerResult<Json<SuccessResponse>> {
    let marked = state
        .db
        .with_conn(|conn| NotificationStore::new(conn).mark_read(&id, &user.id))?;
    if !marked {
        return Err(not_found(&id));
    }
    Ok(Json(SuccessResponse::ok()))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<UpdatedResponse>> {
    let updated = state
        .db
        .with_conn(|conn| NotificationStore::new(conn).mark_all_read(&user.id))?;
    Ok(Json(UpdatedResponse { updated }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let deleted = state
        .db
        .with_conn(|conn| NotificationStore::new(conn).delete(&id, &user.id))?;
    if !deleted {
        return Err(not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_preferences(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<NotificationPreferences>> {
    let preferences = state
        .db
        .with_conn(|conn| UserStore::new(conn).notification_preferences(&user.id))?;
    Ok(Json(preferences))
}

/// Merge a partial preferences object over the current one
pub async fn update_preferences(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(patch): Json<Value>,
) -> ServerResult<Json<NotificationPreferences>> {
    if !patch.is_object() {
        return Err(ServerError::BadRequest("preferences must be a JSON object".to_string()));
    }

    let current = state
        .db
        .with_conn(|conn| UserStore::new(conn).notification_preferences(&user.id))?;
    let mut merged = serde_json::to_value(current)?;
    merge_json(&mut merged, &patch);
    let preferences: NotificationPreferences = serde_json::from_value(merged)
        .map_err(|err| ServerError::BadRequest(format!("invalid preferences: {err}")))?;
    preferences.check()?;

    let stored = state.db.with_conn(|conn| {
        UserStore::new(conn).set_notification_preferences(&user.id, &preferences)
    })?;
    Ok(Json(stored))
}

pub async fn cleanup(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<RemovedResponse>> {
    let removed = state
        .notifications
        .cleanup(state.config.notifications.retention_days)?;
    Ok(Json(RemovedResponse { removed }))
}

pub async fn send_bulk(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<BulkNotificationRequest>,
) -> ServerResult<Json<SentResponse>> {
    request.validate()?;
    let sent = state
        .notifications
        .send_bulk(&request.user_ids, &request.notification)
        .await?;
    Ok(Json(SentResponse { sent }))
}

/// Announcement to every admin
pub async fn send_system(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(notification): Json<NewNotification>,
) -> ServerResult<Json<SentResponse>> {
    notification.validate()?;
    let sent = state
        .notifications
        .notify_admins(Audience::System, &notification)
        .await?;
    Ok(Json(SentResponse { sent }))
}
