// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Login, current user and logout

use crate::auth::AuthUser;
use crate::error::ServerResult;
use crate::middleware::ClientInfo;
use crate::services::login::LoginFailure;
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::Utc;
use folio_api_contract::{
    LoginRequest, LoginResponse, NewSecurityEvent, Severity, SuccessResponse, User,
};
use folio_local_db::ActivityStore;
use serde_json::json;
use validator::Validate;

/// Security-log entry for a refused login
fn refusal_event(failure: &LoginFailure, email: &str, client: &ClientInfo) -> NewSecurityEvent {
    let event = match failure {
        LoginFailure::UnknownUser => {
            NewSecurityEvent::new(
                "login_failed",
                Severity::Low,
                format!("Login for unknown account {email}"),
            )
        }
        LoginFailure::Banned { .. } => {
            NewSecurityEvent::new(
                "login_blocked",
                Severity::Low,
                format!("Login attempt on banned account {email}"),
            )
        }
        LoginFailure::InvalidPassword { user_id, attempts } => NewSecurityEvent::new(
            "login_failed",
            Severity::Low,
            format!("Invalid password for {email}"),
        )
        .details(json!({ "attempts": attempts }))
        .user(user_id.as_str()),
        LoginFailure::Locked { user_id, minutes } => NewSecurityEvent::new(
            "account_locked",
            Severity::Medium,
            format!("Account {email} locked after repeated failed logins"),
        )
        .details(json!({ "lockoutMinutes": minutes }))
        .user(user_id.as_str()),
    };
    event
        .ip(client.ip.clone())
        .user_agent(client.user_agent.clone())
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(request): Json<LoginRequest>,
) -> ServerResult<Json<LoginResponse>> {
    request.validate()?;

    let now = Utc::now();
    let outcome = state
        .login
        .authenticate(&state.db, &request.email, &request.password, &client, now)?;

    let user = match outcome {
        Ok(user) => user,
        Err(failure) => {
            let event = refusal_event(&failure, &request.email, &client);
            if let Err(err) = state.security.log_event(event).await {
                tracing::error!(error = %err, "failed to record refused login");
            }
            return Err(failure.into());
        }
    };

    let (token, expires_at) = state.tokens.issue(&user, now)?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// Tokens are stateless; logging out only leaves a trace in the activity log
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<SuccessResponse>> {
    state.db.with_conn(|conn| {
        ActivityStore::new(conn).record(&user.id, "logout", "Signed out", &json!({}))
    })?;
    Ok(Json(SuccessResponse::ok()))
}
