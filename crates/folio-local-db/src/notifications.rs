// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Per-user notifications

use crate::codec::{json, new_id, text_enum, to_json};
use crate::Result;
use chrono::{DateTime, Utc};
use folio_api_contract::{NewNotification, Notification};
use rusqlite::{params, Connection, Row};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, kind, category, link, read, metadata, created_at";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: text_enum(row, 4)?,
        category: row.get(5)?,
        link: row.get(6)?,
        read: row.get(7)?,
        metadata: json(row, 8)?,
        created_at: row.get(9)?,
    })
}

pub struct NotificationStore<'a> {
    conn: &'a Connection,
}

impl<'a> NotificationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(
        &self,
        user_id: &str,
        new: &NewNotification,
        metadata: serde_json::Value,
    ) -> Result<Notification> {
        let notification = Notification {
            id: new_id(),
            user_id: user_id.to_string(),
            title: new.title.clone(),
            message: new.message.clone(),
            kind: new.kind,
            category: new.category.clone(),
            link: new.link.clone(),
            read: false,
            metadata,
            created_at: Utc::now(),
        };
        self.insert_row(&notification)?;
        Ok(notification)
    }

    fn insert_row(&self, n: &Notification) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO notifications ({NOTIFICATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                n.id,
                n.user_id,
                n.title,
                n.message,
                n.kind.as_str(),
                n.category,
                n.link,
                n.read,
                to_json(&n.metadata)?,
                n.created_at,
            ],
        )?;
        Ok(())
    }

    /// Newest first
    pub fn list(&self, user_id: &str, unread_only: bool, limit: u32) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ?1 AND (?2 = 0 OR read = 0)
             ORDER BY created_at DESC, rowid DESC LIMIT ?3"
        ))?;
        let rows = stmt
            .query_map(params![user_id, unread_only, limit], notification_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Mark one notification read; `false` when the caller does not own it
    pub fn mark_read(&self, id: &str, user_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let changed = self.conn.execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
            params![user_id],
        )?;
        Ok(changed as u64)
    }

    /// Delete one notification; `false` when the caller does not own it
    pub fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn unread_count(&self, user_id: &str) -> Result<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    /// Remove read notifications created before `cutoff`
    pub fn delete_read_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let changed = self.conn.execute(
            "DELETE FROM notifications WHERE read = 1 AND created_at < ?1",
            params![cutoff],
        )?;
        Ok(changed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, UserStore};
    use chrono::Duration;
    use folio_api_contract::UserRole;
    use serde_json::json;

    #[test]
    fn read_marking_respects_ownership() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let alice = users.create("alice@example.com", "Alice", "h", UserRole::User)?;
            let bob = users.create("bob@example.com", "Bob", "h", UserRole::User)?;
            let store = NotificationStore::new(conn);
            let n = store.insert(&alice.id, &NewNotification::new("Hi", "There"), json!({}))?;

            assert!(!store.mark_read(&n.id, &bob.id)?);
            assert_eq!(store.unread_count(&alice.id)?, 1);
            assert!(store.mark_read(&n.id, &alice.id)?);
            assert_eq!(store.unread_count(&alice.id)?, 0);
            assert!(store.list(&alice.id, true, 50)?.is_empty());
            assert_eq!(store.list(&alice.id, false, 50)?.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn cleanup_only_removes_old_read_rows() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let user = UserStore::new(conn).create("c@example.com", "C", "h", UserRole::User)?;
            let store = NotificationStore::new(conn);
            let mut old_read = store.insert(&user.id, &NewNotification::new("a", "a"), json!({}))?;
            old_read.id = new_id();
            old_read.read = true;
            old_read.created_at = Utc::now() - Duration::days(40);
            store.insert_row(&old_read)?;

            let mut old_unread = old_read.clone();
            old_unread.id = new_id();
            old_unread.read = false;
            store.insert_row(&old_unread)?;

            let removed = store.delete_read_before(Utc::now() - Duration::days(30))?;
            assert_eq!(removed, 1);
            assert_eq!(store.list(&user.id, false, 50)?.len(), 2);
            Ok(())
        })
        .unwrap();
    }
}
