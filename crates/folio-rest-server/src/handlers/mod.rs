// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Request handlers

pub mod analytics;
pub mod auth;
pub mod backups;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod openapi;
pub mod portfolio;
pub mod posts;
pub mod pricing;
pub mod profile;
pub mod public;
pub mod search;
pub mod security;
pub mod settings;
pub mod testimonials;
pub mod users;

use crate::error::ServerResult;
use crate::middleware::ClientInfo;
use crate::state::AppState;
use folio_api_contract::User;

/// Append an admin action to the audit trail
pub(crate) fn audit(
    state: &AppState,
    actor: &User,
    client: &ClientInfo,
    action: &str,
    details: serde_json::Value,
) -> ServerResult<()> {
    state.security.audit(
        action,
        &actor.id,
        details,
        client.ip.as_deref(),
        client.user_agent.as_deref(),
    )?;
    Ok(())
}
