// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Security logging, IP blocking and request threat detection

use crate::error::{ServerError, ServerResult};
use crate::services::notifications::{Audience, NotificationService};
use chrono::{Duration, Utc};
use folio_api_contract::{
    AuditEntry, BlockIpRequest, BlockedIp, NewNotification, NewSecurityEvent, NotificationKind,
    SecurityLogEntry, SecurityRule, SecurityRuleInput,
};
use folio_local_db::{Database, SecurityStore};
use regex::{Regex, RegexBuilder};
use std::sync::{Arc, PoisonError, RwLock};

const BUILTIN_PATTERNS: &[&str] = &[
    r"sql\s*injection",
    r"cross\s*site",
    r"<script\b[^>]*>[\s\S]*?</script>",
];

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Case-insensitive pattern set applied to request bodies
pub struct ThreatDetector {
    patterns: RwLock<Vec<Regex>>,
}

impl Default for ThreatDetector {
    fn default() -> Self {
        let patterns = BUILTIN_PATTERNS
            .iter()
            .filter_map(|pattern| compile(pattern).ok())
            .collect();
        Self {
            patterns: RwLock::new(patterns),
        }
    }
}

impl ThreatDetector {
    pub fn add_pattern(&self, pattern: &str) -> Result<(), regex::Error> {
        let regex = compile(pattern)?;
        self.patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(regex);
        Ok(())
    }

    pub fn is_threat(&self, content: &str) -> bool {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|pattern| pattern.is_match(content))
    }
}

pub struct SecurityService {
    db: Arc<Database>,
    notifications: Arc<NotificationService>,
    detector: ThreatDetector,
}

impl SecurityService {
    pub fn new(db: Arc<Database>, notifications: Arc<NotificationService>) -> Self {
        Self {
            db,
            notifications,
            detector: ThreatDetector::default(),
        }
    }

    pub fn detector(&self) -> &ThreatDetector {
        &self.detector
    }

    /// Add enabled pattern rules from the database to the detector
    pub fn load_rules(&self) -> ServerResult<usize> {
        let rules = self.db.with_conn(|conn| SecurityStore::new(conn).rules())?;
        let mut loaded = 0;
        for rule in rules.iter().filter(|rule| rule.is_active_pattern()) {
            let Some(pattern) = rule.pattern.as_deref() else {
                continue;
            };
            match self.detector.add_pattern(pattern) {
                Ok(()) => loaded += 1,
                Err(err) => {
                    tracing::warn!(rule = %rule.name, error = %err, "skipping invalid rule")
                }
            }
        }
        Ok(loaded)
    }

    /// Store an event; high and critical events also alert the admins
    pub async fn log_event(&self, event: NewSecurityEvent) -> ServerResult<SecurityLogEntry> {
        let entry = self.db.with_conn(|conn| SecurityStore::new(conn).log(&event))?;
        if !entry.severity.is_alerting() {
            return Ok(entry);
        }

        tracing::error!(
            event_type = %entry.event_type,
            severity = %entry.severity,
            ip = ?entry.ip,
            "{}",
            entry.message
        );

        let alert = NewNotification::new(
            format!("Security alert: {}", entry.event_type),
            entry.message.clone(),
        )
        .kind(NotificationKind::Error)
        .category("security")
        .link("/admin/security")
        .with_sound();
        let (sent, error) = match self
            .notifications
            .notify_admins(Audience::Security, &alert)
            .await
        {
            Ok(count) => (count > 0, None),
            Err(err) => (false, Some(err.to_string())),
        };
        self.db.with_conn(|conn| {
            SecurityStore::new(conn).record_alert(&entry, sent, error.as_deref())
        })?;
        Ok(entry)
    }

    /// Whether `ip` is currently blocked; expired entries are removed
    pub fn is_blocked(&self, ip: &str) -> ServerResult<bool> {
        Ok(self.db.with_conn(|conn| {
            let store = SecurityStore::new(conn);
            match store.blocked_ip(ip)? {
                None => Ok(false),
                Some(blocked) if blocked.expires_at.is_some_and(|at| at <= Utc::now()) => {
                    store.unblock_ip(ip)?;
                    Ok(false)
                }
                Some(_) => Ok(true),
            }
        })?)
    }

    pub async fn block_ip(
        &self,
        request: &BlockIpRequest,
        blocked_by: &str,
    ) -> ServerResult<BlockedIp> {
        let expires_at = request
            .duration_secs
            .map(|secs| Utc::now() + Duration::seconds(secs.min(i64::MAX as u64) as i64));
        let blocked = self.db.with_conn(|conn| {
            SecurityStore::new(conn).block_ip(&request.ip, &request.reason, expires_at)
        })?;
        self.log_event(
            NewSecurityEvent::new(
                "ip_blocked",
                folio_api_contract::Severity::Medium,
                format!("IP {} blocked: {}", request.ip, request.reason),
            )
            .ip(Some(request.ip.clone()))
            .user(blocked_by),
        )
        .await?;
        Ok(blocked)
    }

    pub fn unblock_ip(&self, ip: &str) -> ServerResult<()> {
        let removed = self.db.with_conn(|conn| SecurityStore::new(conn).unblock_ip(ip))?;
        if !removed {
            return Err(ServerError::NotFound(format!("IP '{ip}' is not blocked")));
        }
        Ok(())
    }

    /// Store a rule; pattern rules must compile and start matching immediately
    pub fn create_rule(&self, input: &SecurityRuleInput) -> ServerResult<SecurityRule> {
        if input.rule_type == "pattern" {
            let pattern = input
                .pattern
                .as_deref()
                .ok_or_else(|| ServerError::BadRequest("pattern rules need a pattern".into()))?;
            compile(pattern)
                .map_err(|e| ServerError::BadRequest(format!("invalid pattern: {e}")))?;
        }
        let rule = self
            .db
            .with_conn(|conn| SecurityStore::new(conn).create_rule(input))?;
        if let (true, Some(pattern)) = (rule.is_active_pattern(), rule.pattern.as_deref()) {
            self.detector
                .add_pattern(pattern)
                .map_err(|e| ServerError::BadRequest(format!("invalid pattern: {e}")))?;
        }
        Ok(rule)
    }

    /// Record an administrative action in the audit trail
    pub fn audit(
        &self,
        action: &str,
        user_id: &str,
        details: serde_json::Value,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> ServerResult<AuditEntry> {
        Ok(self.db.with_conn(|conn| {
            SecurityStore::new(conn).audit(action, user_id, &details, ip, user_agent)
        })?)
    }
}
