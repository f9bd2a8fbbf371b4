// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The signed-in user's own profile, activity and security settings

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::{ServerError, ServerResult};
use crate::middleware::ClientInfo;
use crate::state::AppState;
use axum::{extract::State, Json};
use folio_api_contract::{
    ActivityEntry, ChangePasswordRequest, NewSecurityEvent, SecurityLogEntry, SecurityLogFilter,
    SecurityOverview, Severity, SuccessResponse, UpdateProfileRequest, UpdateSecurityRequest,
    User, UserProfile,
};
use folio_local_db::{ActivityStore, Connection, SecurityStore, UserStore};
use serde_json::json;
use validator::Validate;

const ACTIVITY_LIMIT: u32 = 20;
const OVERVIEW_LOG_LIMIT: u32 = 5;

fn security_logs(
    conn: &Connection,
    user_id: &str,
    limit: u32,
) -> folio_local_db::Result<Vec<SecurityLogEntry>> {
    SecurityStore::new(conn).logs(&SecurityLogFilter {
        user_id: Some(user_id.to_string()),
        limit: Some(limit),
        ..Default::default()
    })
}

fn overview(conn: &Connection, user: &User) -> folio_local_db::Result<SecurityOverview> {
    Ok(SecurityOverview {
        two_factor_enabled: user.two_factor_enabled,
        last_login: user.last_login,
        login_attempts: user.login_attempts,
        security_logs: security_logs(conn, &user.id, OVERVIEW_LOG_LIMIT)?,
    })
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<UserProfile>> {
    Ok(Json(state.db.with_conn(|conn| UserStore::new(conn).profile(&user.id))?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ServerResult<Json<UserProfile>> {
    request.validate()?;
    let profile = state.db.transaction(|tx| {
        let profile = UserStore::new(tx).update_profile(&user.id, &request)?;
        ActivityStore::new(tx).record(
            &user.id,
            "profile_update",
            "Updated profile",
            &json!({ "changes": request }),
        )?;
        Ok(profile)
    })?;
    Ok(Json(profile))
}

pub async fn activities(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<Vec<ActivityEntry>>> {
    let entries = state
        .db
        .with_conn(|conn| ActivityStore::new(conn).for_user(&user.id, ACTIVITY_LIMIT))?;
    Ok(Json(entries))
}

pub async fn get_security(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<SecurityOverview>> {
    Ok(Json(state.db.with_conn(|conn| overview(conn, &user))?))
}

pub async fn update_security(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Json(request): Json<UpdateSecurityRequest>,
) -> ServerResult<Json<SecurityOverview>> {
    let user = state.db.with_conn(|conn| {
        UserStore::new(conn).set_two_factor(&user.id, request.two_factor_enabled)
    })?;

    let message = if request.two_factor_enabled {
        "Two-factor authentication enabled"
    } else {
        "Two-factor authentication disabled"
    };
    state
        .security
        .log_event(
            NewSecurityEvent::new("change", Severity::Low, message)
                .details(json!({ "twoFactorEnabled": request.two_factor_enabled }))
                .ip(client.ip)
                .user_agent(client.user_agent)
                .user(user.id.as_str()),
        )
        .await?;

    Ok(Json(state.db.with_conn(|conn| overview(conn, &user))?))
}

pub async fn security_activities(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<Vec<SecurityLogEntry>>> {
    let logs = state
        .db
        .with_conn(|conn| security_logs(conn, &user.id, ACTIVITY_LIMIT))?;
    Ok(Json(logs))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Json(request): Json<ChangePasswordRequest>,
) -> ServerResult<Json<SuccessResponse>> {
    request.validate()?;

    let current = state
        .db
        .with_conn(|conn| UserStore::new(conn).password_hash(&user.id))?;
    if !verify_password(&request.current_password, &current) {
        return Err(ServerError::Auth("Current password is incorrect".to_string()));
    }

    let hash = hash_password(&request.new_password)?;
    state
        .db
        .with_conn(|conn| UserStore::new(conn).set_password(&user.id, &hash))?;
    state
        .security
        .log_event(
            NewSecurityEvent::new("password_change", Severity::Low, "Password changed")
                .ip(client.ip)
                .user_agent(client.user_agent)
                .user(user.id.as_str()),
        )
        .await?;
    Ok(Json(SuccessResponse::ok()))
}
