// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Activity feed and login history

use crate::codec::{json, new_id, to_json};
use crate::Result;
use chrono::Utc;
use folio_api_contract::{ActivityEntry, LoginHistoryEntry};
use rusqlite::{params, Connection, Row};

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: row.get(2)?,
        description: row.get(3)?,
        metadata: json(row, 4)?,
        created_at: row.get(5)?,
    })
}

pub struct ActivityStore<'a> {
    conn: &'a Connection,
}

impl<'a> ActivityStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn record(
        &self,
        user_id: &str,
        action: &str,
        description: &str,
        metadata: &serde_json::Value,
    ) -> Result<ActivityEntry> {
        let entry = ActivityEntry {
            id: new_id(),
            user_id: user_id.to_string(),
            action: action.to_string(),
            description: description.to_string(),
            metadata: metadata.clone(),
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO activity_log (id, user_id, action, description, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.user_id,
                entry.action,
                entry.description,
                to_json(&entry.metadata)?,
                entry.created_at,
            ],
        )?;
        Ok(entry)
    }

    /// Latest entries for one user, newest first
    pub fn for_user(&self, user_id: &str, limit: u32) -> Result<Vec<ActivityEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, action, description, metadata, created_at FROM activity_log
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit], activity_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Latest entries across all users
    pub fn recent(&self, limit: u32) -> Result<Vec<ActivityEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, action, description, metadata, created_at FROM activity_log
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], activity_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

pub struct LoginHistoryStore<'a> {
    conn: &'a Connection,
}

impl<'a> LoginHistoryStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn record(
        &self,
        user_id: &str,
        ip: Option<&str>,
        user_agent: Option<&str>,
        success: bool,
        reason: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO login_history (id, user_id, ip, user_agent, success, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![new_id(), user_id, ip, user_agent, success, reason, Utc::now()],
        )?;
        Ok(())
    }

    pub fn for_user(&self, user_id: &str, limit: u32) -> Result<Vec<LoginHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, ip, user_agent, success, reason, created_at FROM login_history
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(LoginHistoryEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    ip: row.get(2)?,
                    user_agent: row.get(3)?,
                    success: row.get(4)?,
                    reason: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
