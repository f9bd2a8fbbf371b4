// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Security log, alerts, blocked IPs, detection rules and audit trail

use crate::codec::{json, new_id, text_enum, to_json, Filter};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use folio_api_contract::{
    AuditEntry, BlockedIp, NewSecurityEvent, SecurityAlert, SecurityLogEntry, SecurityLogFilter,
    SecurityRule, SecurityRuleInput,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const LOG_COLUMNS: &str = "id, event_type, severity, message, details, ip, user_agent, user_id, \
     resolved, resolved_by, resolved_at, created_at";

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<SecurityLogEntry> {
    Ok(SecurityLogEntry {
        id: row.get(0)?,
        event_type: row.get(1)?,
        severity: text_enum(row, 2)?,
        message: row.get(3)?,
        details: json(row, 4)?,
        ip: row.get(5)?,
        user_agent: row.get(6)?,
        user_id: row.get(7)?,
        resolved: row.get(8)?,
        resolved_by: row.get(9)?,
        resolved_at: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<SecurityAlert> {
    Ok(SecurityAlert {
        id: row.get(0)?,
        log_id: row.get(1)?,
        event_type: row.get(2)?,
        severity: text_enum(row, 3)?,
        message: row.get(4)?,
        notification_sent: row.get(5)?,
        error: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<SecurityRule> {
    Ok(SecurityRule {
        id: row.get(0)?,
        name: row.get(1)?,
        rule_type: row.get(2)?,
        pattern: row.get(3)?,
        enabled: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn blocked_from_row(row: &Row<'_>) -> rusqlite::Result<BlockedIp> {
    Ok(BlockedIp {
        ip: row.get(0)?,
        reason: row.get(1)?,
        expires_at: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub struct SecurityStore<'a> {
    conn: &'a Connection,
}

impl<'a> SecurityStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn log(&self, event: &NewSecurityEvent) -> Result<SecurityLogEntry> {
        let entry = SecurityLogEntry {
            id: new_id(),
            event_type: event.event_type.clone(),
            severity: event.severity,
            message: event.message.clone(),
            details: event.details.clone(),
            ip: event.ip.clone(),
            user_agent: event.user_agent.clone(),
            user_id: event.user_id.clone(),
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
        };
        self.conn.execute(
            &format!(
                "INSERT INTO security_logs ({LOG_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, NULL, ?9)"
            ),
            params![
                entry.id,
                entry.event_type,
                entry.severity.as_str(),
                entry.message,
                to_json(&entry.details)?,
                entry.ip,
                entry.user_agent,
                entry.user_id,
                entry.created_at,
            ],
        )?;
        Ok(entry)
    }

    /// Newest first
    pub fn logs(&self, filter: &SecurityLogFilter) -> Result<Vec<SecurityLogEntry>> {
        let mut where_ = Filter::default();
        if let Some(event_type) = filter.event_type.clone() {
            where_.push("event_type = ?", event_type);
        }
        if let Some(severity) = filter.severity {
            where_.push("severity = ?", severity.as_str());
        }
        if let Some(resolved) = filter.resolved {
            where_.push("resolved = ?", resolved);
        }
        if let Some(since) = filter.since {
            where_.push("created_at >= ?", since);
        }
        if let Some(until) = filter.until {
            where_.push("created_at < ?", until);
        }
        if let Some(user_id) = filter.user_id.clone() {
            where_.push("user_id = ?", user_id);
        }
        let where_sql = where_.where_sql();
        let limit_sql = where_.limit_sql(filter.limit);
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM security_logs{where_sql} ORDER BY created_at DESC, rowid DESC{limit_sql}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(where_.params(), log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn resolve(&self, id: &str, resolved_by: &str) -> Result<SecurityLogEntry> {
        let changed = self.conn.execute(
            "UPDATE security_logs SET resolved = 1, resolved_by = ?2, resolved_at = ?3 WHERE id = ?1",
            params![id, resolved_by, Utc::now()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("security log", id));
        }
        Ok(self.conn.query_row(
            &format!("SELECT {LOG_COLUMNS} FROM security_logs WHERE id = ?1"),
            params![id],
            log_from_row,
        )?)
    }

    /// Unresolved high and critical events, newest first
    pub fn active_threats(&self) -> Result<Vec<SecurityLogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM security_logs
             WHERE resolved = 0 AND severity IN ('high', 'critical')
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn record_alert(
        &self,
        log: &SecurityLogEntry,
        notification_sent: bool,
        error: Option<&str>,
    ) -> Result<SecurityAlert> {
        let alert = SecurityAlert {
            id: new_id(),
            log_id: log.id.clone(),
            event_type: log.event_type.clone(),
            severity: log.severity,
            message: log.message.clone(),
            notification_sent,
            error: error.map(str::to_string),
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO security_alerts (id, log_id, event_type, severity, message,
                 notification_sent, error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                alert.id,
                alert.log_id,
                alert.event_type,
                alert.severity.as_str(),
                alert.message,
                alert.notification_sent,
                alert.error,
                alert.created_at,
            ],
        )?;
        Ok(alert)
    }

    pub fn alerts(&self, limit: u32) -> Result<Vec<SecurityAlert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, log_id, event_type, severity, message, notification_sent, error, created_at
             FROM security_alerts ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], alert_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn blocked_ip(&self, ip: &str) -> Result<Option<BlockedIp>> {
        Ok(self
            .conn
            .query_row(
                "SELECT ip, reason, expires_at, created_at FROM blocked_ips WHERE ip = ?1",
                params![ip],
                blocked_from_row,
            )
            .optional()?)
    }

    /// Block `ip`, replacing any existing entry
    pub fn block_ip(
        &self,
        ip: &str,
        reason: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<BlockedIp> {
        let blocked = BlockedIp {
            ip: ip.to_string(),
            reason: reason.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO blocked_ips (ip, reason, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(ip) DO UPDATE SET reason = excluded.reason,
                 expires_at = excluded.expires_at, created_at = excluded.created_at",
            params![blocked.ip, blocked.reason, blocked.expires_at, blocked.created_at],
        )?;
        Ok(blocked)
    }

    pub fn unblock_ip(&self, ip: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM blocked_ips WHERE ip = ?1", params![ip])?;
        Ok(changed > 0)
    }

    pub fn blocked_ips(&self) -> Result<Vec<BlockedIp>> {
        let mut stmt = self.conn.prepare(
            "SELECT ip, reason, expires_at, created_at FROM blocked_ips ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([], blocked_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn rules(&self) -> Result<Vec<SecurityRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, rule_type, pattern, enabled, created_at FROM security_rules
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map([], rule_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn create_rule(&self, input: &SecurityRuleInput) -> Result<SecurityRule> {
        let rule = SecurityRule {
            id: new_id(),
            name: input.name.clone(),
            rule_type: input.rule_type.clone(),
            pattern: input.pattern.clone(),
            enabled: input.enabled,
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO security_rules (id, name, rule_type, pattern, enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rule.id,
                rule.name,
                rule.rule_type,
                rule.pattern,
                rule.enabled,
                rule.created_at
            ],
        )?;
        Ok(rule)
    }

    pub fn audit(
        &self,
        action: &str,
        user_id: &str,
        details: &serde_json::Value,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<AuditEntry> {
        let entry = AuditEntry {
            id: new_id(),
            action: action.to_string(),
            user_id: user_id.to_string(),
            details: details.clone(),
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO security_audit (id, action, user_id, details, ip_address, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.action,
                entry.user_id,
                to_json(&entry.details)?,
                entry.ip_address,
                entry.user_agent,
                entry.created_at,
            ],
        )?;
        Ok(entry)
    }

    pub fn audit_trail(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, action, user_id, details, ip_address, user_agent, created_at
             FROM security_audit ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    user_id: row.get(2)?,
                    details: json(row, 3)?,
                    ip_address: row.get(4)?,
                    user_agent: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Duration;
    use folio_api_contract::Severity;

    #[test]
    fn logs_filter_and_resolve() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = SecurityStore::new(conn);
            store.log(&NewSecurityEvent::new("login_failed", Severity::Low, "bad password"))?;
            let threat = store.log(
                &NewSecurityEvent::new("threat_detected", Severity::High, "script tag")
                    .ip(Some("10.1.1.1".into())),
            )?;

            let high = store.logs(&SecurityLogFilter {
                severity: Some(Severity::High),
                ..Default::default()
            })?;
            assert_eq!(high.len(), 1);
            assert_eq!(store.active_threats()?.len(), 1);

            let resolved = store.resolve(&threat.id, "admin-1")?;
            assert!(resolved.resolved);
            assert_eq!(resolved.resolved_by.as_deref(), Some("admin-1"));
            assert!(store.active_threats()?.is_empty());

            let unresolved = store.logs(&SecurityLogFilter {
                resolved: Some(false),
                ..Default::default()
            })?;
            assert_eq!(unresolved.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn block_ip_upserts() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = SecurityStore::new(conn);
            store.block_ip("1.2.3.4", "scan", None)?;
            let expires = Utc::now() + Duration::hours(1);
            store.block_ip("1.2.3.4", "abuse", Some(expires))?;
            let blocked = store.blocked_ip("1.2.3.4")?.unwrap();
            assert_eq!(blocked.reason, "abuse");
            assert_eq!(blocked.expires_at, Some(expires));
            assert_eq!(store.blocked_ips()?.len(), 1);
            assert!(store.unblock_ip("1.2.3.4")?);
            assert!(store.blocked_ip("1.2.3.4")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn alerts_reference_logs() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = SecurityStore::new(conn);
            let log = store.log(&NewSecurityEvent::new("ip_blocked", Severity::Critical, "x"))?;
            store.record_alert(&log, false, Some("no admins"))?;
            let alerts = store.alerts(10)?;
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].log_id, log.id);
            assert!(!alerts[0].notification_sent);
            Ok(())
        })
        .unwrap();
    }
}
