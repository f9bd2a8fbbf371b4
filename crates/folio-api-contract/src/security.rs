// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Security log, alert, IP block and rule types

use crate::types::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Security log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SecurityLogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub severity: Severity,
    pub message: String,
    #[cfg_attr(feature = "utoipa", schema(value_type = Object))]
    pub details: serde_json::Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Event to be written to the security log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSecurityEvent {
    pub event_type: String,
    pub severity: Severity,
    pub message: String,
    pub details: serde_json::Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
}

impl NewSecurityEvent {
    pub fn new(
        event_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            severity,
            message: message.into(),
            details: serde_json::Value::Object(Default::default()),
            ip: None,
            user_agent: None,
            user_id: None,
        }
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Filters for `GET /security/logs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct SecurityLogFilter {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub severity: Option<Severity>,
    pub resolved: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BlockedIp {
    pub ip: String,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BlockIpRequest {
    #[validate(length(min = 1, max = 64))]
    pub ip: String,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    /// Block length in seconds; permanent when absent
    pub duration_secs: Option<u64>,
}

/// Stored detection rule; `pattern` rules feed the threat detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    pub pattern: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl SecurityRule {
    pub fn is_active_pattern(&self) -> bool {
        self.enabled && self.rule_type == "pattern" && self.pattern.is_some()
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct SecurityRuleInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 40))]
    pub rule_type: String,
    pub pattern: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
    pub id: String,
    pub log_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub severity: Severity,
    pub message: String,
    pub notification_sent: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit trail row for an administrative action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub user_id: String,
    #[cfg_attr(feature = "utoipa", schema(value_type = Object))]
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
