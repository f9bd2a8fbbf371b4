// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Security log, threats, IP blocking, rules and the audit trail (admin only)

use crate::auth::AdminUser;
use crate::error::ServerResult;
use crate::handlers::audit;
use crate::middleware::ClientInfo;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use folio_api_contract::{
    AuditEntry, BlockIpRequest, BlockedIp, SecurityAlert, SecurityLogEntry, SecurityLogFilter,
    SecurityRule, SecurityRuleInput,
};
use folio_local_db::SecurityStore;
use serde_json::json;
use validator::Validate;

const ALERT_LIMIT: u32 = 100;
const AUDIT_LIMIT: u32 = 100;

pub async fn logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<SecurityLogFilter>,
) -> ServerResult<Json<Vec<SecurityLogEntry>>> {
    Ok(Json(state.db.with_conn(|conn| SecurityStore::new(conn).logs(&filter))?))
}

pub async fn resolve_log(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ServerResult<Json<SecurityLogEntry>> {
    let entry = state
        .db
        .with_conn(|conn| SecurityStore::new(conn).resolve(&id, &admin.id))?;
    Ok(Json(entry))
}

/// Unresolved high and critical events
pub async fn threats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<Vec<SecurityLogEntry>>> {
    Ok(Json(state.db.with_conn(|conn| SecurityStore::new(conn).active_threats())?))
}

pub async fn blocked_ips(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<Vec<BlockedIp>>> {
    Ok(Json(state.db.with_conn(|conn| SecurityStore::new(conn).blocked_ips())?))
}

pub async fn block_ip(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Json(request): Json<BlockIpRequest>,
) -> ServerResult<(StatusCode, Json<BlockedIp>)> {
    request.validate()?;
    let blocked = state.security.block_ip(&request, &admin.id).await?;
    audit(
        &state,
        &admin,
        &client,
        "ip_blocked",
        json!({ "ip": blocked.ip, "reason": blocked.reason, "expiresAt": blocked.expires_at }),
    )?;
    Ok((StatusCode::CREATED, Json(blocked)))
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(ip): Path<String>,
) -> ServerResult<StatusCode> {
    state.security.unblock_ip(&ip)?;
    audit(&state, &admin, &client, "ip_unblocked", json!({ "ip": ip }))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rules(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<Vec<SecurityRule>>> {
    Ok(Json(state.db.with_conn(|conn| SecurityStore::new(conn).rules())?))
}

pub async fn create_rule(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Json(input): Json<SecurityRuleInput>,
) -> ServerResult<(StatusCode, Json<SecurityRule>)> {
    input.validate()?;
    let rule = state.security.create_rule(&input)?;
    audit(
        &state,
        &admin,
        &client,
        "security_rule_created",
        json!({ "ruleId": rule.id, "name": rule.name, "type": rule.rule_type }),
    )?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn alerts(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<Vec<SecurityAlert>>> {
    Ok(Json(state.db.with_conn(|conn| SecurityStore::new(conn).alerts(ALERT_LIMIT))?))
}

pub async fn audit_trail(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ServerResult<Json<Vec<AuditEntry>>> {
    Ok(Json(state.db.with_conn(|conn| SecurityStore::new(conn).audit_trail(AUDIT_LIMIT))?))
}
