// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! User administration (admin only)

use crate::auth::{hash_password, AdminUser};
use crate::error::{ServerError, ServerResult};
use crate::handlers::audit;
use crate::middleware::ClientInfo;
use crate::services::{analytics, Audience};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use folio_api_contract::{
    ActivityEntry, BanUserRequest, CreateUserRequest, LoginHistoryEntry, NewNotification,
    NotificationKind, RangeQuery, ResetPasswordRequest, SuccessResponse, TimeRange,
    UpdateUserRequest, UpdateUserStatusRequest, User, UserAnalyticsResponse, UserFilter,
};
use folio_local_db::{ActivityStore, LoginHistoryStore, UserStore};
use serde_json::json;
use validator::Validate;

const LOGIN_HISTORY_LIMIT: u32 = 50;
const ACTIVITY_LIMIT: u32 = 20;

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<UserFilter>,
) -> ServerResult<Json<Vec<User>>> {
    let users = state.db.with_conn(|conn| UserStore::new(conn).list(&filter))?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ServerResult<Json<User>> {
    Ok(Json(state.db.with_conn(|conn| UserStore::new(conn).get(&id))?))
}

/// Create an account; a taken e-mail is a conflict
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Json(request): Json<CreateUserRequest>,
) -> ServerResult<(StatusCode, Json<User>)> {
    request.validate()?;

    let hash = hash_password(&request.password)?;
    let user = state.db.with_conn(|conn| {
        UserStore::new(conn).create(&request.email, &request.name, &hash, request.role)
    })?;
    audit(
        &state,
        &admin,
        &client,
        "user_created",
        json!({ "userId": user.id, "email": user.email, "role": user.role }),
    )?;

    let notification = NewNotification::new(
        "New user registered",
        format!("{} ({}) joined as {}", user.name, user.email, user.role.as_str()),
    )
    .kind(NotificationKind::Info)
    .category("users")
    .link(format!("/admin/users/{}", user.id));
    if let Err(err) = state.notifications.notify_admins(Audience::NewUser, &notification).await {
        tracing::warn!(error = %err, "new user notification failed");
    }

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ServerResult<Json<User>> {
    request.validate()?;
    let user = state.db.with_conn(|conn| UserStore::new(conn).update(&id, &request))?;
    audit(&state, &admin, &client, "user_updated", json!({ "userId": id, "changes": request }))?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    if id == admin.id {
        return Err(ServerError::BadRequest("You cannot delete your own account".to_string()));
    }
    state.db.with_conn(|conn| UserStore::new(conn).delete(&id))?;
    audit(&state, &admin, &client, "user_deleted", json!({ "userId": id }))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ban_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(id): Path<String>,
    Json(request): Json<BanUserRequest>,
) -> ServerResult<Json<User>> {
    request.validate()?;
    if id == admin.id {
        return Err(ServerError::BadRequest("You cannot ban your own account".to_string()));
    }

    let until = request.duration.banned_until(Utc::now());
    let metadata = json!({
        "duration": request.duration,
        "reason": request.reason,
        "bannedBy": admin.id,
        "bannedUntil": until,
    });
    let user = state.db.transaction(|tx| {
        let user = UserStore::new(tx).ban(&id, until, &request.reason)?;
        ActivityStore::new(tx).record(
            &id,
            "user_banned",
            &format!("Banned until {}: {}", until.to_rfc3339(), request.reason),
            &metadata,
        )?;
        Ok(user)
    })?;
    audit(&state, &admin, &client, "user_banned", metadata)?;
    Ok(Json(user))
}

pub async fn unban_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(id): Path<String>,
) -> ServerResult<Json<User>> {
    let user = state.db.transaction(|tx| {
        let user = UserStore::new(tx).unban(&id)?;
        ActivityStore::new(tx).record(
            &id,
            "user_unbanned",
            "Ban lifted",
            &json!({ "unbannedBy": admin.id }),
        )?;
        Ok(user)
    })?;
    audit(&state, &admin, &client, "user_unbanned", json!({ "userId": id }))?;
    Ok(Json(user))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserStatusRequest>,
) -> ServerResult<Json<User>> {
    let user = state
        .db
        .with_conn(|conn| UserStore::new(conn).set_status(&id, request.status))?;
    audit(
        &state,
        &admin,
        &client,
        "user_status_changed",
        json!({ "userId": id, "status": request.status }),
    )?;
    Ok(Json(user))
}

pub async fn reset_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(id): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    request.validate()?;
    let hash = hash_password(&request.password)?;
    state
        .db
        .with_conn(|conn| UserStore::new(conn).set_password(&id, &hash))?;
    audit(&state, &admin, &client, "password_reset", json!({ "userId": id }))?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn login_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<LoginHistoryEntry>>> {
    let history = state.db.with_conn(|conn| {
        UserStore::new(conn).get(&id)?;
        LoginHistoryStore::new(conn).for_user(&id, LOGIN_HISTORY_LIMIT)
    })?;
    Ok(Json(history))
}

pub async fn activities(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<ActivityEntry>>> {
    let entries = state.db.with_conn(|conn| {
        UserStore::new(conn).get(&id)?;
        ActivityStore::new(conn).for_user(&id, ACTIVITY_LIMIT)
    })?;
    Ok(Json(entries))
}

pub async fn user_analytics(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RangeQuery>,
) -> ServerResult<Json<UserAnalyticsResponse>> {
    let range: TimeRange = query.parse()?;
    let now = Utc::now();
    let response = state
        .db
        .with_conn(|conn| analytics::user_analytics(conn, range, now))?;
    Ok(Json(response))
}
